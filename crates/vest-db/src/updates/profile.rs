//! Profile update builder.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }
}

pub struct ProfileUpdateBuilder(ProfileUpdate);

impl ProfileUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(ProfileUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    /// `None` clears the stored phone number.
    #[must_use]
    pub fn phone(mut self, phone: Option<String>) -> Self {
        self.0.phone = Some(phone);
        self
    }

    #[must_use]
    pub fn build(self) -> ProfileUpdate {
        self.0
    }
}

impl Default for ProfileUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
