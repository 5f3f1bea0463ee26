use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref MAC_PATTERN: Regex = Regex::new(
        r"^(?:[0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5}|[0-9A-Fa-f]{2}(?:-[0-9A-Fa-f]{2}){5})$"
    )
    .expect("mac pattern compiles");
}

/// A saved device as returned by `GET /api/devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub mac: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Device {
    pub fn label(&self) -> String {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.mac);
        format!("{name} ({})", self.mac)
    }
}

/// Six two-digit hex groups with one separator kind throughout, `:` or `-`.
pub fn is_valid_mac(input: &str) -> bool {
    MAC_PATTERN.is_match(input)
}

pub fn remove_prompt(label: &str) -> String {
    format!("Are you sure you want to remove device \"{label}\"?")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceListView {
    pub placeholder: String,
    pub options: Vec<DeviceOption>,
    pub status: String,
    pub online: bool,
    pub selected: String,
    pub remove_enabled: bool,
}

impl Default for DeviceListView {
    fn default() -> Self {
        Self {
            placeholder: "Choose a device...".to_string(),
            options: Vec::new(),
            status: "No device selected".to_string(),
            online: false,
            selected: String::new(),
            remove_enabled: false,
        }
    }
}

impl DeviceListView {
    pub fn loaded(devices: &[Device]) -> Self {
        if devices.is_empty() {
            return Self {
                placeholder: "No saved devices yet".to_string(),
                status: "No devices saved. Add your first device above!".to_string(),
                ..Self::default()
            };
        }
        let count = devices.len();
        let plural = if count == 1 { "" } else { "s" };
        Self {
            options: devices
                .iter()
                .map(|d| DeviceOption {
                    value: d.mac.clone(),
                    label: d.label(),
                })
                .collect(),
            status: format!("{count} saved device{plural} available"),
            online: true,
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            placeholder: "Error loading devices".to_string(),
            status: "Error loading devices".to_string(),
            ..Self::default()
        }
    }

    pub fn select(&mut self, mac: &str) {
        let mac = mac.trim();
        self.selected = mac.to_string();
        self.remove_enabled = !mac.is_empty();
        if mac.is_empty() {
            self.status = "No device selected".to_string();
            self.online = false;
        } else {
            self.status = format!("Selected: {}", self.label_for(mac));
            self.online = true;
        }
    }

    /// Confirmation text for removing the selected device.
    pub fn remove_prompt(&self) -> String {
        remove_prompt(&self.label_for(&self.selected))
    }

    /// Option text for `mac`, or the MAC itself when it is not in the list.
    pub fn label_for(&self, mac: &str) -> String {
        self.options
            .iter()
            .find(|o| o.value == mac)
            .map(|o| o.label.clone())
            .unwrap_or_else(|| mac.to_string())
    }
}
