use std::borrow::Cow;
use std::fmt;

use crate::Tag;

/// HTML attributes whose value is a whitespace-separated list.
pub const MULTI_VALUED_ATTRIBUTES: &[&str] = &[
    "class",
    "rel",
    "rev",
    "accept-charset",
    "headers",
    "accesskey",
    "dropzone",
];

/// Returns `true` if `name` is stored as a list in HTML mode.
pub fn is_multi_valued(name: &str) -> bool {
    MULTI_VALUED_ATTRIBUTES.contains(&name)
}

/// Convert a Rust-friendly attribute key into the attribute name that is emitted.
///
/// A single trailing underscore is removed so reserved words can be spelled
/// (`class_`, `type_`, `for_`), then every remaining underscore becomes a hyphen
/// (`hx_post` → `hx-post`, `data_user_id` → `data-user-id`).
pub fn attribute_name(key: &str) -> String {
    key.strip_suffix('_').unwrap_or(key).replace('_', "-")
}

/// The stored value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// A plain string value.
    Text(String),
    /// A multi-valued attribute such as `class`, serialized space-joined.
    List(Vec<String>),
    /// A valueless boolean attribute such as `disabled` or `hx-boost`.
    Flag,
}

impl AttrValue {
    /// The value as a string slice if this is [`AttrValue::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The values if this is [`AttrValue::List`].
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// The value as it appears in markup, or `None` for a valueless flag.
    pub fn to_markup_value(&self) -> Option<Cow<'_, str>> {
        match self {
            AttrValue::Text(text) => Some(Cow::Borrowed(text)),
            AttrValue::List(list) => Some(Cow::Owned(list.join(" "))),
            AttrValue::Flag => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_markup_value() {
            Some(value) => f.write_str(&value),
            None => Ok(()),
        }
    }
}

/// A value that can be written to an attribute.
///
/// `multi_valued` tells the conversion whether the target attribute is a list
/// attribute such as `class`. Returning `None` removes the attribute.
pub trait IntoAttrValue {
    /// Convert into the stored representation.
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue>;
}

impl IntoAttrValue for AttrValue {
    fn into_attr_value(self, _multi_valued: bool) -> Option<AttrValue> {
        Some(self)
    }
}

fn text_value(text: String, multi_valued: bool) -> AttrValue {
    if multi_valued {
        AttrValue::List(text.split_whitespace().map(str::to_string).collect())
    } else {
        AttrValue::Text(text)
    }
}

impl IntoAttrValue for &str {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        Some(text_value(self.to_string(), multi_valued))
    }
}

impl IntoAttrValue for String {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        Some(text_value(self, multi_valued))
    }
}

impl IntoAttrValue for &String {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        self.as_str().into_attr_value(multi_valued)
    }
}

impl IntoAttrValue for Cow<'_, str> {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        Some(text_value(self.into_owned(), multi_valued))
    }
}

impl IntoAttrValue for char {
    fn into_attr_value(self, _multi_valued: bool) -> Option<AttrValue> {
        Some(AttrValue::Text(self.to_string()))
    }
}

/// HTML boolean-attribute semantics: present and valueless, or absent.
impl IntoAttrValue for bool {
    fn into_attr_value(self, _multi_valued: bool) -> Option<AttrValue> {
        self.then_some(AttrValue::Flag)
    }
}

macro_rules! display_attr_values {
    ($($ty:ty),*) => {
        $(
            impl IntoAttrValue for $ty {
                fn into_attr_value(self, _multi_valued: bool) -> Option<AttrValue> {
                    Some(AttrValue::Text(self.to_string()))
                }
            }
        )*
    };
}
display_attr_values!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: IntoAttrValue> IntoAttrValue for Option<T> {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        self.and_then(|value| value.into_attr_value(multi_valued))
    }
}

/// Strings become JSON text; objects, arrays, numbers and booleans are JSON-encoded; `null` removes.
impl IntoAttrValue for serde_json::Value {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        match self {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text_value(text, multi_valued)),
            other => Some(AttrValue::Text(other.to_string())),
        }
    }
}

fn list_value(items: Vec<String>, multi_valued: bool) -> AttrValue {
    if multi_valued {
        AttrValue::List(items)
    } else {
        AttrValue::Text(serde_json::Value::from(items).to_string())
    }
}

impl<S: Into<String>> IntoAttrValue for Vec<S> {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        Some(list_value(
            self.into_iter().map(Into::into).collect(),
            multi_valued,
        ))
    }
}

impl<S: Into<String>, const N: usize> IntoAttrValue for [S; N] {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        Some(list_value(
            self.into_iter().map(Into::into).collect(),
            multi_valued,
        ))
    }
}

impl IntoAttrValue for &[&str] {
    fn into_attr_value(self, multi_valued: bool) -> Option<AttrValue> {
        Some(list_value(
            self.iter().map(|s| s.to_string()).collect(),
            multi_valued,
        ))
    }
}

/// A live view of a tag's `class` attribute.
///
/// Every mutation goes straight to the tag, so it shows up in serialization.
#[derive(Debug, Clone)]
pub struct ClassList {
    tag: Tag,
}

impl ClassList {
    pub(crate) fn new(tag: Tag) -> Self {
        Self { tag }
    }

    fn with_list<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> Option<R> {
        self.tag.with_attrs_mut(|attrs| {
            let entry = attrs
                .entry("class".to_string())
                .or_insert_with(|| AttrValue::List(Vec::new()));
            let mut classes = match std::mem::replace(entry, AttrValue::Flag) {
                AttrValue::List(list) => list,
                AttrValue::Text(text) => text.split_whitespace().map(str::to_string).collect(),
                AttrValue::Flag => Vec::new(),
            };
            let result = f(&mut classes);
            *entry = AttrValue::List(classes);
            result
        })
    }

    fn read<R>(&self, f: impl FnOnce(&[String]) -> R) -> R {
        let classes = self.to_vec();
        f(&classes)
    }

    /// Add `class` unless it is already present.
    pub fn add(&self, class: &str) -> &Self {
        self.with_list(|list| {
            if !list.iter().any(|c| c == class) {
                list.push(class.to_string());
            }
        });
        self
    }

    /// Add every class in `classes`, skipping ones already present.
    pub fn extend<'a>(&self, classes: impl IntoIterator<Item = &'a str>) -> &Self {
        for class in classes {
            self.add(class);
        }
        self
    }

    /// Remove `class`, returning whether it was present.
    pub fn remove(&self, class: &str) -> bool {
        self.with_list(|list| {
            let before = list.len();
            list.retain(|c| c != class);
            list.len() != before
        })
        .unwrap_or(false)
    }

    /// Whether `class` is present.
    pub fn contains(&self, class: &str) -> bool {
        self.read(|classes| classes.iter().any(|c| c == class))
    }

    /// Add `class` if absent, remove it if present. Returns whether it is now present.
    pub fn toggle(&self, class: &str) -> bool {
        if self.remove(class) {
            false
        } else {
            self.add(class);
            true
        }
    }

    /// Remove every class, leaving an empty `class` attribute.
    pub fn clear(&self) {
        self.with_list(Vec::clear);
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.read(<[String]>::len)
    }

    /// Whether there are no classes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the classes in order.
    pub fn to_vec(&self) -> Vec<String> {
        match self.tag.get_attr("class") {
            Some(AttrValue::List(list)) => list,
            Some(AttrValue::Text(text)) => text.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_name_convention() {
        assert_eq!(attribute_name("class_"), "class");
        assert_eq!(attribute_name("type_"), "type");
        assert_eq!(attribute_name("hx_post"), "hx-post");
        assert_eq!(attribute_name("data_user_id"), "data-user-id");
        assert_eq!(attribute_name("href"), "href");
    }

    #[test]
    fn strings_split_on_multi_valued_attributes() {
        assert_eq!(
            "btn  btn-primary".into_attr_value(true),
            Some(AttrValue::List(vec!["btn".into(), "btn-primary".into()]))
        );
        assert_eq!(
            "btn  btn-primary".into_attr_value(false),
            Some(AttrValue::Text("btn  btn-primary".into()))
        );
    }

    #[test]
    fn booleans_are_flags_or_absent() {
        assert_eq!(true.into_attr_value(false), Some(AttrValue::Flag));
        assert_eq!(false.into_attr_value(false), None);
        assert_eq!(None::<&str>.into_attr_value(false), None);
    }

    #[test]
    fn sequences_are_json_on_plain_attributes() {
        assert_eq!(
            vec!["a", "b"].into_attr_value(false),
            Some(AttrValue::Text(r#"["a","b"]"#.into()))
        );
        assert_eq!(
            ["a", "b"].into_attr_value(true),
            Some(AttrValue::List(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn json_values_are_encoded() {
        let value = serde_json::json!({"key": "value", "flag": true});
        let stored = value.clone().into_attr_value(false).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(stored.as_str().unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn markup_value_joins_lists() {
        let list = AttrValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(list.to_markup_value().as_deref(), Some("a b"));
        assert_eq!(AttrValue::Flag.to_markup_value(), None);
    }
}
