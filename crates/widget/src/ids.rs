use std::fmt;

use uuid::Uuid;

// Message and toast ids are only minted here and compared; nothing parses them back.
macro_rules! widget_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, formatter)
            }
        }
    };
}

widget_id!(
    /// Identity of a rendered message, stable across content replacements.
    MessageId
);
widget_id!(ToastId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_distinct() {
        let ids = (0..64).map(|_| MessageId::new_v7()).collect::<std::collections::HashSet<_>>();

        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn toast_id_displays_as_hyphenated_uuid() {
        let rendered = ToastId::new_v7().to_string();

        assert_eq!(rendered.len(), 36);
        assert_eq!(rendered.matches('-').count(), 4);
    }
}
