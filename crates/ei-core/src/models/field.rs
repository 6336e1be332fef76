/// One configurable value the installer needs in the `.env` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub description: &'static str,
    pub default: Option<&'static str>,
    pub required: bool,
    pub secret: bool,
}

impl FieldSpec {
    const fn required(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            default: None,
            required: true,
            secret: false,
        }
    }

    const fn optional(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            default: None,
            required: false,
            secret: false,
        }
    }

    const fn secret(self) -> Self {
        Self {
            secret: true,
            ..self
        }
    }

    /// Default value, treating an empty default as none.
    pub fn default_value(&self) -> Option<&'static str> {
        self.default.filter(|d| !d.is_empty())
    }

    /// Prompt label shown to the user, e.g. `Database host [5432]: `.
    pub fn label(&self) -> String {
        match (self.default_value(), self.required) {
            (Some(default), _) => format!("{} [{default}]: ", self.description),
            (None, true) => format!("{}: ", self.description),
            (None, false) => format!("{} (optional): ", self.description),
        }
    }
}

/// Values collected interactively, in prompt order.
pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("APP_HOST", "Public hostname for the application"),
    FieldSpec::required("DB_HOST", "Database host"),
    FieldSpec::required("DB_USERNAME", "Database username"),
    FieldSpec::required("DB_PASSWORD", "Database password").secret(),
    FieldSpec::required("LICENSE_KEY", "Enterprise license key").secret(),
    FieldSpec::optional("SMTP_ADDRESS", "SMTP server address"),
    FieldSpec::optional("SMTP_USERNAME", "SMTP username"),
    FieldSpec::optional("SMTP_PASSWORD", "SMTP password").secret(),
    FieldSpec::optional("IMAGE_TAG", "Release tag to deploy (blank for latest)"),
];

/// Settings written only when absent. Never prompted.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("PORT", "3000"),
    ("DB_PORT", "5432"),
    ("DB_NAME", "enterprise_production"),
    ("RAILS_ENV", "production"),
    ("RAILS_LOG_TO_STDOUT", "true"),
];

/// Registry login fields. Collected only when the registry rejects the
/// current credentials and never written to the `.env` file.
pub const REGISTRY_CREDENTIALS: [FieldSpec; 2] = [
    FieldSpec::required("REGISTRY_USERNAME", "Registry username"),
    FieldSpec::required("REGISTRY_TOKEN", "Registry access token").secret(),
];

pub const IMAGE_TAG_KEY: &str = "IMAGE_TAG";
pub const PORT_KEY: &str = "PORT";
pub const LATEST_TAG: &str = "latest";
pub const DEFAULT_PORT: &str = "3000";

/// Whether `key` names a secret in any of the installer's field tables.
pub fn is_secret(key: &str) -> bool {
    FIELDS
        .iter()
        .chain(REGISTRY_CREDENTIALS.iter())
        .any(|f| f.key == key && f.secret)
}
