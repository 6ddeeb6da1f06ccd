use serde::Serialize;

use crate::{error::FlowError, models::identity::IdNumber};

pub const GROUP_COUNT: usize = 3;
pub const GROUP_LEN: usize = 4;

/// The identity number entry: three 4-digit groups with auto-advancing focus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdentityInput {
    groups: [String; GROUP_COUNT],
    focus: usize,
    error: Option<String>,
}

impl IdentityInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[String; GROUP_COUNT] {
        &self.groups
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces the contents of one group. Non-digits are dropped silently and the
    /// group keeps at most 4 digits. A full group moves focus to the next one.
    pub fn set_group(&mut self, index: usize, text: &str) -> Result<(), FlowError> {
        let group = self
            .groups
            .get_mut(index)
            .ok_or(FlowError::UnknownSelection("digit group"))?;
        *group = crate::utils::strip_non_digits(text)
            .chars()
            .take(GROUP_LEN)
            .collect();
        self.error = None;
        self.focus = index;
        if group.len() == GROUP_LEN && index < GROUP_COUNT - 1 {
            self.focus = index + 1;
        }
        Ok(())
    }

    /// Spreads a whole pasted number over the three groups.
    pub fn fill(&mut self, raw: &str) {
        let digits = crate::utils::strip_non_digits(raw);
        let mut chars = digits.chars();
        for group in self.groups.iter_mut() {
            *group = chars.by_ref().take(GROUP_LEN).collect();
        }
        self.error = None;
        self.focus = self
            .groups
            .iter()
            .position(|g| g.len() < GROUP_LEN)
            .unwrap_or(GROUP_COUNT - 1);
    }

    pub fn digits(&self) -> String {
        self.groups.concat()
    }

    pub(crate) fn reject(&mut self, err: &FlowError) {
        self.error = Some(err.to_string());
    }

    /// Validates the entered digits. On failure the error stays on the input.
    pub fn submit(&mut self) -> Result<IdNumber, FlowError> {
        match IdNumber::parse(self.digits()) {
            Ok(id) => {
                self.error = None;
                Ok(id)
            }
            Err(err) => {
                self.reject(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_group_advances_focus() {
        let mut input = IdentityInput::new();
        input.set_group(0, "1234").unwrap();
        assert_eq!(input.focus(), 1);
        input.set_group(1, "56").unwrap();
        assert_eq!(input.focus(), 1);
        input.set_group(1, "5678").unwrap();
        assert_eq!(input.focus(), 2);
        input.set_group(2, "9012").unwrap();
        assert_eq!(input.focus(), 2);
    }

    #[test]
    fn group_input_is_stripped_and_truncated() {
        let mut input = IdentityInput::new();
        input.set_group(0, "1a2-3 45").unwrap();
        assert_eq!(input.groups()[0], "1234");
        assert!(input.set_group(3, "1").is_err());
    }

    #[test]
    fn short_number_is_rejected_with_inline_error() {
        let mut input = IdentityInput::new();
        input.fill("1234 5678");
        assert_eq!(input.focus(), 2);
        let err = input.submit().unwrap_err();
        assert_eq!(err, FlowError::InvalidIdLength { found: 8 });
        assert!(input.error().unwrap().contains("12 digits"));

        input.set_group(2, "9012").unwrap();
        assert_eq!(input.error(), None);
        assert_eq!(input.submit().unwrap().as_str(), "123456789012");
    }

    #[test]
    fn pasted_number_with_spaces_is_cleaned() {
        let mut input = IdentityInput::new();
        input.fill("1234 5678 9012");
        assert_eq!(input.submit().unwrap().as_str(), "123456789012");
    }

    fn noisy_digits(len: std::ops::Range<usize>) -> impl Strategy<Value = (String, String)> {
        prop::collection::vec(("[0-9]", "[ a-z-]{0,2}"), len).prop_map(|parts| {
            let clean: String = parts.iter().map(|(d, _)| d.as_str()).collect();
            let noisy: String = parts.iter().map(|(d, n)| format!("{}{}", d, n)).collect();
            (clean, noisy)
        })
    }

    proptest! {
        #[test]
        fn twelve_digits_with_noise_are_accepted((clean, noisy) in noisy_digits(12..13)) {
            let mut input = IdentityInput::new();
            input.fill(&noisy);
            let id = input.submit().unwrap();
            prop_assert_eq!(id.as_str(), clean.as_str());
        }

        #[test]
        fn other_digit_counts_are_rejected((clean, noisy) in noisy_digits(0..24)) {
            prop_assume!(clean.len() != 12);
            prop_assert!(IdNumber::parse(&noisy).is_err());
        }
    }
}
