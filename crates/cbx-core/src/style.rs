//! Style / layout resolver.
//!
//! Holds the presentation attributes of one block instance and enforces the
//! transitions between visual styles:
//!
//! - switching style resets `columns` to the style default unless the user
//!   has picked a column count themselves (a one-way latch);
//! - exactly one `is-style-<name>` class token is present at a time;
//! - the "read more" link cannot be shown without the excerpt.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const STYLE_PREFIX: &str = "is-style-";
const FIRST_POST_IMAGE_TOKEN: &str = "display-first-post-image";

/// Visual style variations of the Advanced Posts block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleName {
    #[default]
    Stacked,
    Horizontal,
    Featured,
}

impl StyleName {
    pub const ALL: [StyleName; 3] = [StyleName::Stacked, StyleName::Horizontal, StyleName::Featured];

    pub fn as_str(self) -> &'static str {
        match self {
            StyleName::Stacked => "stacked",
            StyleName::Horizontal => "horizontal",
            StyleName::Featured => "featured",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Column count a style starts with.
    pub fn default_columns(self) -> u32 {
        match self {
            StyleName::Stacked | StyleName::Featured => 2,
            StyleName::Horizontal => 1,
        }
    }

    /// Stacked and featured lay items out vertically with the image on top.
    pub fn is_vertical(self) -> bool {
        !matches!(self, StyleName::Horizontal)
    }

    fn token(self) -> String {
        format!("{STYLE_PREFIX}{}", self.as_str())
    }
}

/// Which side the image sits on in the horizontal style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    Left,
    #[default]
    Right,
}

/// Whitespace-separated class tokens, order preserving and duplicate free.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn parse(class_name: &str) -> Self {
        let mut list = ClassList::default();
        for token in class_name.split_whitespace() {
            list.add(token);
        }
        list
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn add(&mut self, token: &str) {
        if !token.is_empty() && !self.contains(token) {
            self.0.push(token.to_string());
        }
    }

    pub fn remove(&mut self, token: &str) {
        self.0.retain(|t| t != token);
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn value(&self) -> String {
        self.0.join(" ")
    }
}

impl From<ClassList> for String {
    fn from(list: ClassList) -> Self {
        list.value()
    }
}

/// The style named by the first known `is-style-*` token, else the default.
pub fn active_style(classes: &ClassList) -> StyleName {
    classes
        .tokens()
        .filter_map(|t| t.strip_prefix(STYLE_PREFIX))
        .find_map(StyleName::parse)
        .unwrap_or_default()
}

/// Swaps the active style token for `new_style`, leaving other tokens alone.
pub fn replace_active_style(classes: &mut ClassList, new_style: StyleName) {
    let current = active_style(classes).token();
    let replacement = new_style.token();
    match classes.0.iter().position(|t| *t == current) {
        Some(pos) => classes.0[pos] = replacement.clone(),
        None => classes.add(&replacement),
    }
    // Any other style tokens would make the active style ambiguous.
    let keep = classes.0.iter().position(|t| *t == replacement);
    let mut index = 0;
    classes.0.retain(|t| {
        let retain = Some(index) == keep
            || !t.strip_prefix(STYLE_PREFIX).is_some_and(|s| StyleName::parse(s).is_some());
        index += 1;
        retain
    });
}

/// Presentation attributes of one block instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleAttributes {
    style_name: StyleName,
    classes: ClassList,
    columns: u32,
    user_modified_columns: bool,
    display_post_content: bool,
    display_post_link: bool,
    display_first_post_image: bool,
    pub list_image_position: ImagePosition,
    pub image_size_class: String,
    pub display_thumbnail: bool,
    pub display_post_date: bool,
    pub display_category: bool,
    pub excerpt_word_limit: u32,
    pub align: Option<String>,
    pub post_link_label: String,
}

impl Default for StyleAttributes {
    fn default() -> Self {
        let style = StyleName::default();
        let mut classes = ClassList::default();
        classes.add(&style.token());
        Self {
            style_name: style,
            classes,
            columns: style.default_columns(),
            user_modified_columns: false,
            display_post_content: true,
            display_post_link: false,
            display_first_post_image: false,
            list_image_position: ImagePosition::Right,
            image_size_class: "w-1/7 sm:w-1/5 h-1/7 sm:h-1/5".to_string(),
            display_thumbnail: true,
            display_post_date: true,
            display_category: false,
            excerpt_word_limit: 12,
            align: None,
            post_link_label: "Read more".to_string(),
        }
    }
}

impl StyleAttributes {
    /// Rebuilds the attributes of a persisted block.
    ///
    /// The active style is read from `class_name`. When the latch was not
    /// persisted it is inferred: a column count that differs from the style
    /// default can only come from the user.
    pub fn restore(
        class_name: &str,
        columns: u32,
        user_modified_columns: Option<bool>,
    ) -> Result<Self> {
        if columns == 0 {
            return Err(AppError::ValidationError("columns must be at least 1".into()));
        }
        let mut classes = ClassList::parse(class_name);
        let style = active_style(&classes);
        replace_active_style(&mut classes, style);

        Ok(Self {
            style_name: style,
            display_first_post_image: classes.contains(FIRST_POST_IMAGE_TOKEN),
            classes,
            columns,
            user_modified_columns: user_modified_columns
                .unwrap_or(columns != style.default_columns()),
            ..Self::default()
        })
    }

    pub fn style_name(&self) -> StyleName {
        self.style_name
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn user_modified_columns(&self) -> bool {
        self.user_modified_columns
    }

    pub fn display_post_content(&self) -> bool {
        self.display_post_content
    }

    pub fn display_post_link(&self) -> bool {
        self.display_post_link
    }

    pub fn display_first_post_image(&self) -> bool {
        self.display_first_post_image
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn set_style(&mut self, style: StyleName) {
        self.style_name = style;
        replace_active_style(&mut self.classes, style);
        if !self.user_modified_columns {
            self.columns = style.default_columns();
        }
    }

    pub fn set_columns(&mut self, columns: u32) -> Result<()> {
        if columns == 0 {
            return Err(AppError::ValidationError("columns must be at least 1".into()));
        }
        self.columns = columns;
        self.user_modified_columns = true;
        Ok(())
    }

    pub fn set_display_post_content(&mut self, display: bool) {
        self.display_post_content = display;
        if !display {
            self.display_post_link = false;
        }
    }

    /// Ignored (kept off) while the excerpt is hidden.
    pub fn set_display_post_link(&mut self, display: bool) {
        self.display_post_link = display && self.display_post_content;
    }

    pub fn set_display_first_post_image(&mut self, display: bool) {
        self.display_first_post_image = display;
        if display {
            self.classes.add(FIRST_POST_IMAGE_TOKEN);
        } else {
            self.classes.remove(FIRST_POST_IMAGE_TOKEN);
        }
    }

    /// Class attribute of the block wrapper.
    pub fn wrapper_class(&self) -> String {
        let mut class = self.classes.value();
        if let Some(align) = self.align.as_deref().filter(|a| !a.is_empty()) {
            if !class.is_empty() {
                class.push(' ');
            }
            class.push_str("align");
            class.push_str(align);
        }
        class
    }

    /// Class attribute of the post list container.
    pub fn list_class(&self) -> String {
        format!("columns columns-{} list-none ml-0 pl-0 pt-3", self.columns)
    }
}
