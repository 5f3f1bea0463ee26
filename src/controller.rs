use crate::api::{ApiError, Backend, Download, PreviewData};
use crate::devices::{self, DeviceListView};
use crate::form::QueryForm;
use crate::table;
use crate::view::{
    Alert, AlertKind, LOADING_DOWNLOAD, LOADING_PREVIEW, PageView, PreviewView, Progress,
    RegistrationView, TestLine,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    /// Another test was still running.
    Ignored,
    /// The MAC never left the page: empty or malformed.
    Rejected,
    Online,
    Offline,
    NetworkError,
}

#[derive(Default)]
struct PageState {
    alert: Option<Alert>,
    devices: DeviceListView,
    registration: RegistrationView,
    tested_mac: Option<String>,
    form: QueryForm,
    loading: Option<String>,
    dataset: Option<PreviewData>,
}

/// Page controller: owns the transient UI state and runs every user action.
pub struct Controller {
    backend: Arc<dyn Backend>,
    state: Mutex<PageState>,
    test_in_progress: AtomicBool,
    progress_tx: broadcast::Sender<Progress>,
}

impl Controller {
    pub fn new(backend: Arc<dyn Backend>, form: QueryForm) -> Self {
        let (progress_tx, _) = broadcast::channel(16);
        Self {
            backend,
            state: Mutex::new(PageState {
                form,
                ..PageState::default()
            }),
            test_in_progress: AtomicBool::new(false),
            progress_tx,
        }
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    pub fn view(&self) -> PageView {
        self.with_state(|state| {
            let mut registration = state.registration.clone();
            registration.save_enabled = state
                .tested_mac
                .as_deref()
                .is_some_and(|mac| mac == registration.new_mac.trim());
            PageView {
                alert: state.alert.clone(),
                devices: state.devices.clone(),
                registration,
                form: state.form.clone(),
                loading: state.loading.clone(),
                preview: state.dataset.as_ref().map(|data| PreviewView {
                    summary: format!(
                        "Showing {} of {} records",
                        data.records.len(),
                        data.total_records
                    ),
                    table: table::build_table(&data.records),
                }),
            }
        })
    }

    /// Remembers what the user typed so re-rendered pages keep it.
    pub fn update_inputs(&self, form: QueryForm, new_mac: &str, new_name: &str) {
        self.with_state(|state| {
            state.form = form;
            state.registration.new_mac = new_mac.to_string();
            state.registration.new_name = new_name.to_string();
        });
    }

    pub fn clear_alert(&self) {
        self.with_state(|state| state.alert = None);
    }

    pub async fn load_devices(&self) {
        match self.backend.list_devices().await {
            Ok(list) => {
                tracing::debug!(count = list.len(), "loaded saved devices");
                let empty = list.is_empty();
                self.with_state(|state| {
                    state.devices = DeviceListView::loaded(&list);
                    state.form.device_mac.clear();
                });
                if empty {
                    self.show_alert(
                        AlertKind::Info,
                        "No saved devices found. Enter a MAC address above to get started.",
                    );
                }
            }
            Err(err) => {
                tracing::warn!("Unable to load saved devices: {err}");
                self.with_state(|state| {
                    state.devices = DeviceListView::failed();
                    state.form.device_mac.clear();
                });
                self.show_alert(
                    AlertKind::Error,
                    "Error loading saved devices. Please refresh the page.",
                );
            }
        }
    }

    pub fn select_device(&self, mac: &str) {
        self.with_state(|state| {
            state.devices.select(mac);
            state.form.device_mac = mac.trim().to_string();
        });
    }

    pub async fn test_device(&self, mac: &str) -> TestOutcome {
        if self.test_in_progress.load(Ordering::Acquire) {
            return TestOutcome::Ignored;
        }
        let mac = mac.trim();
        if mac.is_empty() {
            self.show_alert(AlertKind::Warning, "Please enter a MAC address");
            return TestOutcome::Rejected;
        }
        if !devices::is_valid_mac(mac) {
            self.show_alert(
                AlertKind::Warning,
                "Invalid MAC address format. Use format: aa:bb:cc:dd:ee:ff",
            );
            return TestOutcome::Rejected;
        }
        if self
            .test_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return TestOutcome::Ignored;
        }
        let _run = TestRun::start(self);

        self.publish_progress(25);
        self.publish_progress(50);
        let result = self.backend.test_device(mac).await;
        self.publish_progress(75);

        match result {
            Ok(report) => {
                self.publish_progress(100);
                if report.works {
                    tracing::info!("Device {mac} is online");
                    self.with_state(|state| {
                        state.registration.test_line = Some(TestLine::Online(report.message));
                        state.tested_mac = Some(mac.to_string());
                    });
                    self.show_alert(
                        AlertKind::Success,
                        "Device test successful! You can now save this device.",
                    );
                    TestOutcome::Online
                } else {
                    tracing::info!("Device {mac} is offline: {}", report.message);
                    self.show_alert(
                        AlertKind::Error,
                        format!("Device test failed: {}", report.message),
                    );
                    self.with_state(|state| {
                        state.registration.test_line = Some(TestLine::Offline(report.message));
                    });
                    TestOutcome::Offline
                }
            }
            Err(err) => {
                tracing::warn!("Device test for {mac} failed: {err}");
                self.with_state(|state| {
                    state.registration.test_line = Some(TestLine::NetworkError);
                });
                self.show_alert(
                    AlertKind::Error,
                    "Network error during device test. Please check your connection and try again.",
                );
                TestOutcome::NetworkError
            }
        }
    }

    pub async fn save_device(&self, mac: &str, name: &str) {
        let mac = mac.trim();
        let name = name.trim();
        let tested = self.with_state(|state| state.tested_mac.as_deref() == Some(mac));
        if !tested {
            self.show_alert(
                AlertKind::Warning,
                "Test the device successfully before saving it",
            );
            return;
        }

        let busy = Busy::set(self, |r, on| r.saving = on);
        let name = (!name.is_empty()).then_some(name);
        match self.backend.save_device(mac, name).await {
            Ok(()) => {
                tracing::info!("Saved device {mac}");
                self.show_alert(
                    AlertKind::Success,
                    "Device saved successfully! It's now available in your device list.",
                );
                self.with_state(|state| {
                    state.registration.new_mac.clear();
                    state.registration.new_name.clear();
                    state.registration.test_line = None;
                    state.tested_mac = None;
                });
                drop(busy);
                self.load_devices().await;
            }
            Err(err) => self.report_failure(
                &err,
                "Failed to save device",
                "Network error while saving device",
            ),
        }
    }

    /// Deletes `mac` once the user has confirmed the prompt naming it.
    pub async fn remove_device(&self, mac: &str, confirmed: bool) {
        let mac = mac.trim();
        if mac.is_empty() || !confirmed {
            return;
        }

        let busy = Busy::set(self, |r, on| r.removing = on);
        match self.backend.remove_device(mac).await {
            Ok(()) => {
                tracing::info!("Removed device {mac}");
                self.show_alert(AlertKind::Success, "Device removed successfully");
                drop(busy);
                self.load_devices().await;
            }
            Err(err) => self.report_failure(
                &err,
                "Failed to remove device",
                "Network error while removing device",
            ),
        }
    }

    pub async fn preview(&self, form: QueryForm) {
        if !self.accept_form(&form) {
            return;
        }
        let _loading = Loading::show(self, LOADING_PREVIEW);
        match self.backend.preview(&form).await {
            Ok(data) => {
                tracing::info!(
                    shown = data.records.len(),
                    total = data.total_records,
                    "Preview loaded for {}",
                    form.device_mac
                );
                self.with_state(|state| state.dataset = Some(data));
                self.show_alert(
                    AlertKind::Success,
                    "Data preview loaded successfully! Review the data below.",
                );
            }
            Err(err) => self.report_failure(
                &err,
                "Failed to load data preview",
                "Network error occurred while loading preview",
            ),
        }
    }

    pub fn close_preview(&self) {
        self.with_state(|state| state.dataset = None);
    }

    /// Fetches the export file; `None` when validation or the request failed.
    pub async fn download(&self, form: QueryForm) -> Option<Download> {
        if !self.accept_form(&form) {
            return None;
        }
        let _loading = Loading::show(self, LOADING_DOWNLOAD);
        match self.backend.download(&form).await {
            Ok(file) => {
                tracing::info!(bytes = file.bytes.len(), "Prepared download {}", file.filename);
                self.show_alert(
                    AlertKind::Success,
                    "File downloaded successfully! Check your downloads folder.",
                );
                Some(file)
            }
            Err(err) => {
                self.report_failure(
                    &err,
                    "Failed to download data",
                    "Network error occurred during download",
                );
                None
            }
        }
    }

    // Stores the form and validates it; on success any previous alert is cleared.
    fn accept_form(&self, form: &QueryForm) -> bool {
        self.with_state(|state| state.form = form.clone());
        match form.validate() {
            Ok(()) => {
                self.clear_alert();
                true
            }
            Err(err) => {
                tracing::debug!("Form rejected: {err}");
                self.show_alert(AlertKind::Warning, err.to_string());
                false
            }
        }
    }

    fn report_failure(&self, err: &ApiError, fallback: &str, network: &str) {
        tracing::warn!("{fallback}: {err}");
        let message = match err {
            ApiError::Network(_) => network.to_string(),
            ApiError::Rejected(detail) => detail
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(fallback)
                .to_string(),
        };
        self.show_alert(AlertKind::Error, message);
    }

    fn show_alert(&self, kind: AlertKind, message: impl Into<String>) {
        let alert = Alert {
            kind,
            message: message.into(),
        };
        self.with_state(|state| state.alert = Some(alert));
    }

    fn publish_progress(&self, percent: u8) {
        self.with_state(|state| state.registration.progress = Some(percent));
        let _ = self.progress_tx.send(Progress::Step(percent));
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Marks a device test as running until dropped.
struct TestRun<'a> {
    controller: &'a Controller,
}

impl<'a> TestRun<'a> {
    fn start(controller: &'a Controller) -> Self {
        controller.with_state(|state| {
            state.registration.testing = true;
            state.registration.test_line = Some(TestLine::Pending);
            state.tested_mac = None;
        });
        Self { controller }
    }
}

impl Drop for TestRun<'_> {
    fn drop(&mut self) {
        self.controller.with_state(|state| {
            state.registration.testing = false;
            state.registration.progress = None;
        });
        let _ = self.controller.progress_tx.send(Progress::Hidden);
        self.controller
            .test_in_progress
            .store(false, Ordering::Release);
    }
}

struct Busy<'a> {
    controller: &'a Controller,
    flag: fn(&mut RegistrationView, bool),
}

impl<'a> Busy<'a> {
    fn set(controller: &'a Controller, flag: fn(&mut RegistrationView, bool)) -> Self {
        controller.with_state(|state| flag(&mut state.registration, true));
        Self { controller, flag }
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        let flag = self.flag;
        self.controller
            .with_state(|state| flag(&mut state.registration, false));
    }
}

struct Loading<'a> {
    controller: &'a Controller,
}

impl<'a> Loading<'a> {
    fn show(controller: &'a Controller, message: &str) -> Self {
        controller.with_state(|state| state.loading = Some(message.to_string()));
        Self { controller }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.controller.with_state(|state| state.loading = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestReport;
    use crate::devices::Device;
    use crate::form::DataType;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl Gate {
        async fn pass(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    struct FakeBackend {
        devices: Result<Vec<Device>, ApiError>,
        test: Result<TestReport, ApiError>,
        save: Result<(), ApiError>,
        remove: Result<(), ApiError>,
        preview: Mutex<Result<PreviewData, ApiError>>,
        download: Result<Download, ApiError>,
        gate: Option<Arc<Gate>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl Default for FakeBackend {
        fn default() -> Self {
            let records = vec![
                json!({"t": 21.5, "airQualityLevel": "Good"}),
                json!({"t": 22.0, "airQualityLevel": "Moderate"}),
            ]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
            Self {
                devices: Ok(vec![Device {
                    mac: "aa:bb:cc:dd:ee:01".into(),
                    name: Some("Roof".into()),
                }]),
                test: Ok(TestReport {
                    works: true,
                    message: "sensor answered".into(),
                }),
                save: Ok(()),
                remove: Ok(()),
                preview: Mutex::new(Ok(PreviewData {
                    records,
                    total_records: 240,
                })),
                download: Ok(Download {
                    filename: "foo.csv".into(),
                    content_type: None,
                    bytes: b"a,b\n".to_vec(),
                }),
                gate: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeBackend {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        async fn maybe_wait(&self) {
            if let Some(gate) = &self.gate {
                gate.pass().await;
            }
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn list_devices(&self) -> Result<Vec<Device>, ApiError> {
            self.record("list");
            self.devices.clone()
        }

        async fn test_device(&self, _mac: &str) -> Result<TestReport, ApiError> {
            self.record("test");
            self.maybe_wait().await;
            self.test.clone()
        }

        async fn save_device(&self, _mac: &str, _name: Option<&str>) -> Result<(), ApiError> {
            self.record("save");
            self.save.clone()
        }

        async fn remove_device(&self, _mac: &str) -> Result<(), ApiError> {
            self.record("remove");
            self.remove.clone()
        }

        async fn preview(&self, _form: &QueryForm) -> Result<PreviewData, ApiError> {
            self.record("preview");
            self.maybe_wait().await;
            self.preview.lock().unwrap().clone()
        }

        async fn download(&self, _form: &QueryForm) -> Result<Download, ApiError> {
            self.record("download");
            self.download.clone()
        }
    }

    fn setup(backend: FakeBackend) -> (Arc<Controller>, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let controller = Arc::new(Controller::new(backend.clone(), QueryForm::default()));
        (controller, backend)
    }

    fn valid_form() -> QueryForm {
        QueryForm {
            device_mac: "aa:bb:cc:dd:ee:01".into(),
            data_type: DataType::All,
            ..QueryForm::default()
        }
    }

    fn alert(controller: &Controller) -> Alert {
        controller.view().alert.expect("alert shown")
    }

    #[tokio::test]
    async fn empty_device_list_shows_info() {
        let (controller, _) = setup(FakeBackend {
            devices: Ok(vec![]),
            ..FakeBackend::default()
        });
        controller.load_devices().await;

        let view = controller.view();
        assert_eq!(view.devices.placeholder, "No saved devices yet");
        assert_eq!(view.alert.unwrap().kind, AlertKind::Info);
    }

    #[tokio::test]
    async fn device_list_failure_shows_error() {
        let (controller, _) = setup(FakeBackend {
            devices: Err(ApiError::Network("refused".into())),
            ..FakeBackend::default()
        });
        controller.load_devices().await;

        let view = controller.view();
        assert_eq!(view.devices.status, "Error loading devices");
        assert_eq!(view.alert.unwrap().kind, AlertKind::Error);
    }

    #[tokio::test]
    async fn selecting_a_device_updates_form() {
        let (controller, _) = setup(FakeBackend::default());
        controller.load_devices().await;
        controller.select_device("aa:bb:cc:dd:ee:01");

        let view = controller.view();
        assert_eq!(view.form.device_mac, "aa:bb:cc:dd:ee:01");
        assert!(view.devices.remove_enabled);
        assert_eq!(
            view.devices.remove_prompt(),
            "Are you sure you want to remove device \"Roof (aa:bb:cc:dd:ee:01)\"?"
        );
    }

    #[tokio::test]
    async fn malformed_mac_never_reaches_backend() {
        let (controller, backend) = setup(FakeBackend::default());

        assert_eq!(controller.test_device("aabbccddeeff").await, TestOutcome::Rejected);
        assert_eq!(alert(&controller).kind, AlertKind::Warning);
        assert_eq!(controller.test_device("  ").await, TestOutcome::Rejected);
        assert_eq!(alert(&controller).message, "Please enter a MAC address");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_test_enables_save_and_reports_progress() {
        let (controller, _) = setup(FakeBackend::default());
        let mut progress = controller.subscribe_progress();
        controller.update_inputs(QueryForm::default(), "aa:bb:cc:dd:ee:ff", "");

        assert_eq!(controller.test_device("aa:bb:cc:dd:ee:ff").await, TestOutcome::Online);

        let view = controller.view();
        assert!(view.registration.save_enabled);
        assert!(!view.registration.testing);
        assert_eq!(view.registration.progress, None);
        assert_eq!(
            view.registration.test_line,
            Some(TestLine::Online("sensor answered".into()))
        );
        assert_eq!(view.alert.unwrap().kind, AlertKind::Success);

        let mut steps = Vec::new();
        while let Ok(step) = progress.try_recv() {
            steps.push(step);
        }
        assert_eq!(
            steps,
            vec![
                Progress::Step(25),
                Progress::Step(50),
                Progress::Step(75),
                Progress::Step(100),
                Progress::Hidden,
            ]
        );
    }

    #[tokio::test]
    async fn offline_device_keeps_save_disabled() {
        let (controller, _) = setup(FakeBackend {
            test: Ok(TestReport {
                works: false,
                message: "no data in 24h".into(),
            }),
            ..FakeBackend::default()
        });
        controller.update_inputs(QueryForm::default(), "aa:bb:cc:dd:ee:ff", "");

        assert_eq!(controller.test_device("aa:bb:cc:dd:ee:ff").await, TestOutcome::Offline);
        let view = controller.view();
        assert!(!view.registration.save_enabled);
        assert_eq!(view.alert.unwrap().message, "Device test failed: no data in 24h");
    }

    #[tokio::test]
    async fn network_failure_still_resets_test_state() {
        let (controller, backend) = setup(FakeBackend {
            test: Err(ApiError::Network("reset by peer".into())),
            ..FakeBackend::default()
        });

        assert_eq!(
            controller.test_device("aa:bb:cc:dd:ee:ff").await,
            TestOutcome::NetworkError
        );
        let view = controller.view();
        assert!(!view.registration.testing);
        assert_eq!(view.registration.test_line, Some(TestLine::NetworkError));
        assert!(view.alert.unwrap().message.starts_with("Network error during device test"));

        // The flag was released, so a retry goes out again.
        controller.test_device("aa:bb:cc:dd:ee:ff").await;
        assert_eq!(backend.calls(), vec!["test", "test"]);
    }

    #[tokio::test]
    async fn second_test_while_running_is_ignored() {
        let gate = Arc::new(Gate::default());
        let (controller, backend) = setup(FakeBackend {
            gate: Some(gate.clone()),
            ..FakeBackend::default()
        });

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.test_device("aa:bb:cc:dd:ee:ff").await })
        };
        gate.entered.notified().await;
        assert!(controller.view().registration.testing);

        assert_eq!(
            controller.test_device("aa:bb:cc:dd:ee:ff").await,
            TestOutcome::Ignored
        );

        gate.release.notify_one();
        assert_eq!(first.await.unwrap(), TestOutcome::Online);
        assert_eq!(backend.calls(), vec!["test"]);
    }

    #[tokio::test]
    async fn save_requires_a_passing_test() {
        let (controller, backend) = setup(FakeBackend::default());
        controller.save_device("aa:bb:cc:dd:ee:ff", "Lab").await;

        assert_eq!(alert(&controller).kind, AlertKind::Warning);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn save_clears_inputs_and_reloads_devices() {
        let (controller, backend) = setup(FakeBackend::default());
        controller.update_inputs(QueryForm::default(), "aa:bb:cc:dd:ee:ff", "Lab");
        controller.test_device("aa:bb:cc:dd:ee:ff").await;
        controller.save_device("aa:bb:cc:dd:ee:ff", "Lab").await;

        let view = controller.view();
        assert_eq!(view.registration.new_mac, "");
        assert_eq!(view.registration.new_name, "");
        assert_eq!(view.registration.test_line, None);
        assert!(!view.registration.save_enabled);
        assert!(!view.registration.saving);
        assert_eq!(view.devices.status, "1 saved device available");
        assert_eq!(backend.calls(), vec!["test", "save", "list"]);
    }

    #[tokio::test]
    async fn rejected_save_without_detail_uses_fallback() {
        let (controller, _) = setup(FakeBackend {
            save: Err(ApiError::Rejected(None)),
            ..FakeBackend::default()
        });
        controller.update_inputs(QueryForm::default(), "aa:bb:cc:dd:ee:ff", "");
        controller.test_device("aa:bb:cc:dd:ee:ff").await;
        controller.save_device("aa:bb:cc:dd:ee:ff", "").await;

        assert_eq!(alert(&controller).message, "Failed to save device");
        assert!(controller.view().registration.save_enabled);
    }

    #[tokio::test]
    async fn remove_needs_confirmation() {
        let (controller, backend) = setup(FakeBackend::default());
        controller.remove_device("aa:bb:cc:dd:ee:01", false).await;
        assert!(backend.calls().is_empty());

        controller.remove_device("aa:bb:cc:dd:ee:01", true).await;
        assert_eq!(backend.calls(), vec!["remove", "list"]);
        assert_eq!(alert(&controller).message, "Device removed successfully");
        assert!(!controller.view().registration.removing);
    }

    #[tokio::test]
    async fn remove_failure_surfaces_server_message() {
        let (controller, _) = setup(FakeBackend {
            remove: Err(ApiError::Rejected(Some("Device not found".into()))),
            ..FakeBackend::default()
        });
        controller.remove_device("aa:bb:cc:dd:ee:01", true).await;
        assert_eq!(alert(&controller).message, "Device not found");
    }

    #[tokio::test]
    async fn invalid_form_blocks_preview() {
        let (controller, backend) = setup(FakeBackend::default());
        controller.preview(QueryForm::default()).await;

        let shown = alert(&controller);
        assert_eq!(shown.kind, AlertKind::Warning);
        assert_eq!(shown.message, "Please select a device or add a new one first");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn preview_stores_dataset_and_summary() {
        let (controller, _) = setup(FakeBackend::default());
        controller.preview(valid_form()).await;

        let view = controller.view();
        let preview = view.preview.expect("preview shown");
        assert_eq!(preview.summary, "Showing 2 of 240 records");
        assert_eq!(preview.table.rows.len(), 2);
        assert_eq!(view.loading, None);
        assert_eq!(view.alert.unwrap().kind, AlertKind::Success);
    }

    #[tokio::test]
    async fn failed_preview_keeps_last_dataset() {
        let (controller, backend) = setup(FakeBackend::default());
        controller.preview(valid_form()).await;

        *backend.preview.lock().unwrap() = Err(ApiError::Network("timeout".into()));
        controller.preview(valid_form()).await;

        let view = controller.view();
        assert_eq!(view.preview.unwrap().summary, "Showing 2 of 240 records");
        assert_eq!(
            view.alert.unwrap().message,
            "Network error occurred while loading preview"
        );

        controller.close_preview();
        assert!(controller.view().preview.is_none());
    }

    #[tokio::test]
    async fn loading_indicator_covers_the_request() {
        let gate = Arc::new(Gate::default());
        let (controller, _) = setup(FakeBackend {
            gate: Some(gate.clone()),
            ..FakeBackend::default()
        });

        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.preview(valid_form()).await })
        };
        gate.entered.notified().await;
        assert_eq!(controller.view().loading.as_deref(), Some(LOADING_PREVIEW));

        gate.release.notify_one();
        task.await.unwrap();
        assert_eq!(controller.view().loading, None);
    }

    #[tokio::test]
    async fn download_returns_file() {
        let (controller, _) = setup(FakeBackend::default());
        let file = controller.download(valid_form()).await.expect("file");
        assert_eq!(file.filename, "foo.csv");
        assert_eq!(controller.view().loading, None);
    }

    #[tokio::test]
    async fn download_failure_alerts() {
        let (controller, _) = setup(FakeBackend {
            download: Err(ApiError::Rejected(Some("No latest data found".into()))),
            ..FakeBackend::default()
        });
        assert!(controller.download(valid_form()).await.is_none());
        assert_eq!(alert(&controller).message, "No latest data found");

        let (controller, _) = controller_with_network_download();
        assert!(controller.download(valid_form()).await.is_none());
        assert_eq!(
            alert(&controller).message,
            "Network error occurred during download"
        );
    }

    fn controller_with_network_download() -> (Arc<Controller>, Arc<FakeBackend>) {
        setup(FakeBackend {
            download: Err(ApiError::Network("refused".into())),
            ..FakeBackend::default()
        })
    }
}
