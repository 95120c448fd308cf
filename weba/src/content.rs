use std::fmt::Display;

use crate::Tag;

/// Anything that can become child nodes: tags, text-like scalars, and
/// options, vectors, arrays and tuples of those.
pub trait Content {
    /// Convert into the nodes to insert, in order.
    fn into_nodes(self) -> Vec<Tag>;
}

impl Content for Tag {
    fn into_nodes(self) -> Vec<Tag> {
        vec![self]
    }
}

impl Content for &Tag {
    fn into_nodes(self) -> Vec<Tag> {
        vec![self.clone()]
    }
}

/// No children.
impl Content for () {
    fn into_nodes(self) -> Vec<Tag> {
        Vec::new()
    }
}

impl<T: Content> Content for Option<T> {
    fn into_nodes(self) -> Vec<Tag> {
        self.map(Content::into_nodes).unwrap_or_default()
    }
}

impl<T: Content> Content for Vec<T> {
    fn into_nodes(self) -> Vec<Tag> {
        self.into_iter().flat_map(Content::into_nodes).collect()
    }
}

impl<T: Content, const N: usize> Content for [T; N] {
    fn into_nodes(self) -> Vec<Tag> {
        self.into_iter().flat_map(Content::into_nodes).collect()
    }
}

impl Content for &[Tag] {
    fn into_nodes(self) -> Vec<Tag> {
        self.to_vec()
    }
}

macro_rules! text_content {
    ($($ty:ty),*) => {
        $(
            impl Content for $ty {
                fn into_nodes(self) -> Vec<Tag> {
                    vec![Tag::new_text(self.to_text())]
                }
            }
        )*
    };
}
text_content!(
    &str, String, &String, char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64
);

macro_rules! tuple_content {
    ($($name:ident),+) => {
        impl<$($name: Content),+> Content for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_nodes(self) -> Vec<Tag> {
                let ($($name,)+) = self;
                let mut nodes = Vec::new();
                $(nodes.extend($name.into_nodes());)+
                nodes
            }
        }
    };
}
tuple_content!(A);
tuple_content!(A, B);
tuple_content!(A, B, C);
tuple_content!(A, B, C, D);
tuple_content!(A, B, C, D, E);
tuple_content!(A, B, C, D, E, F);
tuple_content!(A, B, C, D, E, F, G);
tuple_content!(A, B, C, D, E, F, G, H);

/// Wraps any [`Display`] value so it can be used as content or passed to
/// [`Ui::text`](crate::Ui::text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Text<T>(pub T);

impl<T: Display> Content for Text<T> {
    fn into_nodes(self) -> Vec<Tag> {
        vec![Tag::new_text(self.0.to_string())]
    }
}

/// The canonical string form of a value rendered as text.
pub trait ToText {
    /// The text to emit.
    fn to_text(&self) -> String;
}

impl<T: ToText + ?Sized> ToText for &T {
    fn to_text(&self) -> String {
        (**self).to_text()
    }
}

macro_rules! display_text {
    ($($ty:ty),*) => {
        $(
            impl ToText for $ty {
                fn to_text(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}
display_text!(
    str, String, char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    f32, f64
);

/// `None` is the empty string.
impl<T: ToText> ToText for Option<T> {
    fn to_text(&self) -> String {
        self.as_ref().map(ToText::to_text).unwrap_or_default()
    }
}

impl<T: Display> ToText for Text<T> {
    fn to_text(&self) -> String {
        self.0.to_string()
    }
}

#[cfg(feature = "chrono")]
mod chrono_text {
    use super::ToText;

    /// `2024-12-25`
    impl ToText for chrono::NaiveDate {
        fn to_text(&self) -> String {
            self.format("%Y-%m-%d").to_string()
        }
    }

    /// `12:00:00`, with fractional seconds only when present.
    impl ToText for chrono::NaiveTime {
        fn to_text(&self) -> String {
            self.format("%H:%M:%S%.f").to_string()
        }
    }

    /// `2024-12-25 12:00:00`
    impl ToText for chrono::NaiveDateTime {
        fn to_text(&self) -> String {
            self.format("%Y-%m-%d %H:%M:%S%.f").to_string()
        }
    }

    /// `2024-12-25 12:00:00+00:00`
    impl<Tz: chrono::TimeZone> ToText for chrono::DateTime<Tz>
    where
        Tz::Offset: std::fmt::Display,
    {
        fn to_text(&self) -> String {
            self.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()
        }
    }
}
