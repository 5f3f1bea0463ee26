use crate::devices::DeviceListView;
use crate::form::QueryForm;
use crate::table::PreviewTable;
use serde::Serialize;

pub const TEST_LABEL: &str = "Test";
pub const TESTING_LABEL: &str = "Testing...";
pub const SAVE_LABEL: &str = "Save";
pub const SAVING_LABEL: &str = "Saving...";
pub const REMOVE_LABEL: &str = "Remove Selected";
pub const REMOVING_LABEL: &str = "Removing...";
pub const LOADING_PREVIEW: &str = "Loading data preview...";
pub const LOADING_DOWNLOAD: &str = "Preparing download...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Error,
    Success,
    Warning,
    Info,
}

impl AlertKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            AlertKind::Error => "alert alert-error",
            AlertKind::Success => "alert alert-success",
            AlertKind::Warning => "alert alert-warning",
            AlertKind::Info => "alert alert-info",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AlertKind::Error => "❌",
            AlertKind::Success => "✅",
            AlertKind::Warning => "⚠️",
            AlertKind::Info => "ℹ️",
        }
    }

    /// Success and info alerts fade out on their own.
    pub fn auto_dismiss(&self) -> bool {
        matches!(self, AlertKind::Success | AlertKind::Info)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

/// Result line under the MAC input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestLine {
    Pending,
    Online(String),
    Offline(String),
    NetworkError,
}

impl TestLine {
    pub fn text(&self) -> String {
        match self {
            TestLine::Pending => "Testing device connection...".to_string(),
            TestLine::Online(msg) => format!("Device online: {msg}"),
            TestLine::Offline(msg) => format!("Device offline: {msg}"),
            TestLine::NetworkError => "Network error - please try again".to_string(),
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            TestLine::Pending => "#666",
            TestLine::Online(_) => "#28a745",
            TestLine::Offline(_) | TestLine::NetworkError => "#dc3545",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum Progress {
    Step(u8),
    Hidden,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationView {
    pub new_mac: String,
    pub new_name: String,
    pub test_line: Option<TestLine>,
    pub save_enabled: bool,
    pub testing: bool,
    pub saving: bool,
    pub removing: bool,
    pub progress: Option<u8>,
}

impl RegistrationView {
    pub fn test_label(&self) -> &'static str {
        if self.testing { TESTING_LABEL } else { TEST_LABEL }
    }

    pub fn save_label(&self) -> &'static str {
        if self.saving { SAVING_LABEL } else { SAVE_LABEL }
    }

    pub fn remove_label(&self) -> &'static str {
        if self.removing { REMOVING_LABEL } else { REMOVE_LABEL }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreviewView {
    pub summary: String,
    pub table: PreviewTable,
}

/// Everything the page needs to draw itself.
#[derive(Clone, Debug, PartialEq)]
pub struct PageView {
    pub alert: Option<Alert>,
    pub devices: DeviceListView,
    pub registration: RegistrationView,
    pub form: QueryForm,
    pub loading: Option<String>,
    pub preview: Option<PreviewView>,
}
