use crate::form::DataType;
use crate::table::PreviewTable;
use crate::view::{
    Alert, LOADING_DOWNLOAD, LOADING_PREVIEW, PageView, REMOVING_LABEL, RegistrationView,
    SAVING_LABEL, TESTING_LABEL,
};
use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    /// Element id whose click the shortcut triggers.
    pub target: &'static str,
    pub prevent_default: bool,
}

pub const SHORTCUTS: &[Shortcut] = &[
    Shortcut {
        key: "Enter",
        ctrl: true,
        target: "previewBtn",
        prevent_default: false,
    },
    Shortcut {
        key: "d",
        ctrl: true,
        target: "downloadBtn",
        prevent_default: true,
    },
];

#[derive(Props, Clone, PartialEq)]
pub struct AppProps {
    pub view: PageView,
}

#[derive(Props, Clone, PartialEq)]
pub struct PageProps {
    pub view: PageView,
    /// Id of the server-side state behind this page.
    pub session: String,
}

/// Full page, including styles and the browser glue script.
pub fn render_html(view: &PageView, session: &str) -> String {
    let props = PageProps {
        view: view.clone(),
        session: session.to_string(),
    };
    render(VirtualDom::new_with_props(Page, props))
}

/// Only the swappable `#app` contents.
pub fn render_app(view: &PageView) -> String {
    render(VirtualDom::new_with_props(AppBody, AppProps { view: view.clone() }))
}

fn render(mut dom: VirtualDom) -> String {
    // Build the tree before rendering to avoid SSR panics.
    let mut noop = NoOpMutations {};
    let _ = dom.rebuild(&mut noop);
    dioxus_ssr::render(&mut dom)
}

fn shortcuts_json() -> String {
    serde_json::to_string(SHORTCUTS).unwrap_or_else(|_| "[]".to_string())
}

#[component]
fn Page(props: PageProps) -> Element {
    let shortcuts = shortcuts_json();
    rsx! {
        div { class: "page",
            meta { name: "viewport", content: "width=device-width, initial-scale=1" }
            div { class: "shell",
                div { class: "header",
                    h1 { class: "title", "Air Quality Data Downloader" }
                    p { class: "subtitle", "Pick a sensor, preview its readings, export them as CSV." }
                }
                div { id: "app", "data-session": "{props.session}",
                    AppBody { view: props.view.clone() }
                }
            }
        }
        div { id: "shortcuts", "data-shortcuts": "{shortcuts}" }
        style { dangerous_inner_html: STYLES }
        script { dangerous_inner_html: SCRIPT }
    }
}

#[component]
fn AppBody(props: AppProps) -> Element {
    let view = &props.view;
    let loading_class = if view.loading.is_some() {
        "loading show"
    } else {
        "loading"
    };
    let loading_text = view.loading.clone().unwrap_or_default();
    rsx! {
        div { id: "alerts", {alert_banner(&view.alert)} }
        form { id: "dataForm", autocomplete: "off",
            {device_card(view)}
            {query_card(view)}
        }
        {preview_card(view)}
        div { id: "loading", class: "{loading_class}",
            div { class: "spinner" }
            div { class: "spinner-text", "{loading_text}" }
        }
    }
}

fn alert_banner(alert: &Option<Alert>) -> Element {
    let Some(alert) = alert else {
        return rsx! {};
    };
    let class = alert.kind.css_class();
    let icon = alert.kind.icon();
    let dismiss = alert.kind.auto_dismiss().to_string();
    let message = &alert.message;
    rsx! {
        div { class: "{class}", "data-auto-dismiss": "{dismiss}",
            strong { "{icon}" }
            " {message}"
        }
    }
}

fn device_card(view: &PageView) -> Element {
    let list = &view.devices;
    let reg = &view.registration;
    let status_class = if list.online {
        "device-status online"
    } else {
        "device-status offline"
    };
    let placeholder = &list.placeholder;
    let status = &list.status;
    let prompt = list.remove_prompt();
    let remove_label = reg.remove_label();
    rsx! {
        div { class: "card",
            h2 { class: "card-title", "1. Device" }
            div { class: "row",
                select {
                    id: "device_mac",
                    name: "device_mac",
                    class: "field grow",
                    "data-action": "/ui/devices/select",
                    option { value: "", selected: list.selected.is_empty(), "{placeholder}" }
                    for opt in list.options.iter() {
                        option {
                            value: "{opt.value}",
                            selected: opt.value == list.selected,
                            "{opt.label}"
                        }
                    }
                }
                button {
                    id: "remove_device_btn",
                    r#type: "button",
                    class: "ghost",
                    disabled: !list.remove_enabled || reg.removing,
                    "data-action": "/ui/devices/remove",
                    "data-confirm": "{prompt}",
                    "data-busy-label": REMOVING_LABEL,
                    "{remove_label}"
                }
            }
            div { id: "device_status", class: "{status_class}", "{status}" }
            h3 { class: "group-title", "Add a new device" }
            {registration_row(reg)}
        }
    }
}

fn registration_row(reg: &RegistrationView) -> Element {
    let new_mac = &reg.new_mac;
    let new_name = &reg.new_name;
    let test_label = reg.test_label();
    let save_label = reg.save_label();
    let progress_style = if reg.progress.is_some() {
        "display: block;"
    } else {
        "display: none;"
    };
    let fill_style = format!("width: {}%;", reg.progress.unwrap_or(0));
    let (line_text, line_style) = match &reg.test_line {
        Some(line) => (line.text(), format!("color: {};", line.color())),
        None => (String::new(), String::new()),
    };
    rsx! {
        div { class: "row",
            input {
                id: "new_mac",
                name: "new_mac",
                class: "field grow",
                r#type: "text",
                placeholder: "aa:bb:cc:dd:ee:ff",
                title: "Enter device MAC address in format: aa:bb:cc:dd:ee:ff",
                value: "{new_mac}",
            }
            input {
                id: "new_name",
                name: "new_name",
                class: "field grow",
                r#type: "text",
                placeholder: "Friendly name (optional)",
                value: "{new_name}",
            }
            button {
                id: "test_device_btn",
                r#type: "button",
                class: "ghost",
                disabled: reg.testing,
                "data-action": "/ui/devices/test",
                "data-busy-label": TESTING_LABEL,
                "{test_label}"
            }
            button {
                id: "save_device_btn",
                r#type: "button",
                class: "ghost",
                disabled: !reg.save_enabled || reg.saving,
                "data-action": "/ui/devices/save",
                "data-busy-label": SAVING_LABEL,
                "{save_label}"
            }
        }
        div { id: "test_progress", class: "progress", style: "{progress_style}",
            div { class: "progress-fill", style: "{fill_style}" }
        }
        div { id: "test_result", class: "status",
            span { style: "{line_style}", "{line_text}" }
        }
    }
}

fn query_card(view: &PageView) -> Element {
    let form = &view.form;
    let time_class = if form.is_time_range() {
        "time-inputs show"
    } else {
        "time-inputs"
    };
    let start_date = &form.start_date;
    let end_date = &form.end_date;
    let hours_from = &form.hours_from;
    let hours_to = &form.hours_to;
    rsx! {
        div { class: "card",
            h2 { class: "card-title", "2. Data" }
            div { class: "row",
                label { class: "choice",
                    input {
                        r#type: "radio",
                        name: "data_type",
                        value: "all",
                        checked: form.data_type == DataType::All,
                    }
                    span { "All data" }
                }
                label { class: "choice",
                    input {
                        r#type: "radio",
                        name: "data_type",
                        value: "time_range",
                        checked: form.data_type == DataType::TimeRange,
                    }
                    span { "Time range" }
                }
            }
            div { id: "timeInputs", class: "{time_class}",
                label { class: "field-label",
                    span { "Start date" }
                    input { id: "start_date", name: "start_date", class: "field", r#type: "date", value: "{start_date}" }
                }
                label { class: "field-label",
                    span { "End date" }
                    input { id: "end_date", name: "end_date", class: "field", r#type: "date", value: "{end_date}" }
                }
                label { class: "field-label",
                    span { "From hour" }
                    input {
                        id: "hours_from",
                        name: "hours_from",
                        class: "field",
                        r#type: "number",
                        min: "0",
                        max: "23",
                        title: "Enter starting hour (0 = midnight, 12 = noon)",
                        value: "{hours_from}",
                    }
                }
                label { class: "field-label",
                    span { "To hour" }
                    input {
                        id: "hours_to",
                        name: "hours_to",
                        class: "field",
                        r#type: "number",
                        min: "0",
                        max: "23",
                        title: "Enter ending hour (23 = 11 PM)",
                        value: "{hours_to}",
                    }
                }
            }
            div { class: "row actions",
                button {
                    id: "previewBtn",
                    r#type: "button",
                    class: "ghost grow",
                    "data-action": "/ui/preview",
                    "data-loading": LOADING_PREVIEW,
                    "Preview"
                }
                button {
                    id: "downloadBtn",
                    r#type: "button",
                    class: "primary grow",
                    "data-action": "/ui/download",
                    "data-loading": LOADING_DOWNLOAD,
                    "Download CSV"
                }
            }
            p { class: "caption", "Ctrl+Enter previews, Ctrl+D downloads." }
        }
    }
}

fn preview_card(view: &PageView) -> Element {
    let Some(preview) = &view.preview else {
        return rsx! {};
    };
    let summary = &preview.summary;
    rsx! {
        div { id: "previewSection", class: "card show",
            div { class: "row spread",
                h2 { class: "card-title", "Data preview" }
                button {
                    id: "closePreviewBtn",
                    r#type: "button",
                    class: "pill-btn",
                    "data-action": "/ui/preview/close",
                    "Close"
                }
            }
            div { id: "recordCount", class: "status", "{summary}" }
            div { id: "previewContent", {preview_table(&preview.table)} }
        }
    }
}

fn preview_table(table: &PreviewTable) -> Element {
    if table.is_empty() {
        return rsx! {
            div { class: "empty", "No data available" }
        };
    }
    rsx! {
        div { class: "table-wrap",
            table { class: "preview-table",
                thead {
                    tr {
                        for header in table.headers.iter() {
                            th { "{header}" }
                        }
                    }
                }
                tbody {
                    for row in table.rows.iter() {
                        tr {
                            for cell in row.iter() {
                                td {
                                    style: cell.style.map(|s| s.css()).unwrap_or_default(),
                                    title: "{cell.tooltip}",
                                    "{cell.text}"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

const STYLES: &str = r#"
:root { color-scheme: light; }
* { box-sizing: border-box; }
body, html { margin: 0; padding: 0; background: radial-gradient(circle at 20% 20%, #171a24, #0b0d13 40%), #0b0d13; }
.page { min-height: 100vh; display: flex; justify-content: center; padding: 36px 18px; color: #e9ecf5; font-family: "Space Grotesk", "Inter", system-ui, -apple-system, sans-serif; }
.shell { width: min(1100px, 100%); display: flex; flex-direction: column; gap: 12px; }
.header { display: flex; flex-direction: column; gap: 6px; }
.title { font-size: 26px; margin: 0; letter-spacing: 0.4px; }
.subtitle { margin: 0; color: #9aa4bc; font-size: 15px; }
#app { display: flex; flex-direction: column; gap: 12px; }
#dataForm { display: flex; flex-direction: column; gap: 12px; }
.card { width: 100%; background: linear-gradient(145deg, #161a23, #0f1219); border: 1px solid #1f2230; border-radius: 16px; padding: 22px; box-shadow: 0 18px 44px rgba(0,0,0,0.35); }
.card-title { margin: 0 0 12px 0; font-size: 20px; }
.group-title { margin: 16px 0 10px 0; color: #c5cee3; font-size: 14px; letter-spacing: 0.3px; }
.row { display: flex; flex-wrap: wrap; gap: 10px; align-items: center; }
.row.spread { justify-content: space-between; }
.row.actions { margin-top: 14px; }
.grow { flex: 1; min-width: 160px; }
.field { padding: 10px 12px; border-radius: 10px; border: 1px solid #262b38; background: #0f1118; color: #e9ecf5; font-weight: 600; }
.field-label { display: flex; flex-direction: column; gap: 6px; color: #9aa4bc; font-size: 13px; }
.choice { display: inline-flex; align-items: center; gap: 8px; padding: 10px 12px; background: #10141d; border: 1px solid #1f2230; border-radius: 12px; cursor: pointer; }
.time-inputs { display: none; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 10px; margin-top: 12px; }
.time-inputs.show { display: grid; }
.primary { padding: 14px 16px; border-radius: 12px; border: none; background: linear-gradient(135deg, #ff5f7a, #ff3c5a); color: #0b0d12; font-weight: 800; font-size: 16px; cursor: pointer; }
.ghost { padding: 12px 14px; border-radius: 10px; font-weight: 700; font-size: 15px; cursor: pointer; background: #161925; border: 1px solid #262c3a; color: #c5cee3; }
.ghost:disabled, .primary:disabled { opacity: 0.5; cursor: not-allowed; }
.pill-btn { padding: 8px 10px; border-radius: 10px; border: 1px solid #262b38; background: #0f1118; color: #dfe4f3; font-weight: 700; cursor: pointer; }
.status { margin-top: 10px; color: #8f98ac; font-size: 14px; min-height: 18px; }
.caption { margin: 10px 0 0 0; color: #7c859c; font-size: 13px; }
.device-status { margin-top: 10px; font-size: 14px; }
.device-status.online { color: #4caf50; }
.device-status.offline { color: #8f98ac; }
.progress { height: 6px; margin-top: 10px; border-radius: 999px; background: #10141d; overflow: hidden; }
.progress-fill { height: 100%; background: linear-gradient(90deg, #ff5f7a, #ff3c5a); transition: width 200ms ease; }
.alert { padding: 12px 14px; border-radius: 12px; border: 1px solid #1f2230; font-size: 14px; }
.alert-error { background: #2a1217; border-color: #5c2430; color: #ffb3bf; }
.alert-success { background: #11261a; border-color: #1f4d31; color: #a6e3b8; }
.alert-warning { background: #2a2211; border-color: #5c4a1f; color: #ffd98a; }
.alert-info { background: #111d2a; border-color: #1f3a5c; color: #a8cdf5; }
.table-wrap { overflow-x: auto; }
.preview-table { width: 100%; border-collapse: collapse; font-size: 13px; }
.preview-table th, .preview-table td { padding: 8px 10px; border-bottom: 1px solid #1f2230; text-align: left; white-space: nowrap; }
.preview-table th { color: #9aa4bc; font-weight: 700; }
.empty { text-align: center; padding: 40px; color: #8f98ac; }
.loading { position: fixed; inset: 0; display: none; flex-direction: column; gap: 14px; align-items: center; justify-content: center; background: rgba(5,7,12,0.72); backdrop-filter: blur(6px); }
.loading.show { display: flex; }
.spinner { width: 42px; height: 42px; border-radius: 50%; border: 4px solid #262b38; border-top-color: #ff5f7a; animation: spin 900ms linear infinite; }
.spinner-text { color: #c5cee3; }
@keyframes spin { to { transform: rotate(360deg); } }
@media (max-width: 640px) {
    .page { padding: 20px 14px; }
    .card { padding: 18px; }
    .title { font-size: 22px; }
}
"#;

const SCRIPT: &str = r#"
(() => {
  const app = document.getElementById('app');
  const session = app.dataset.session;
  const shortcutsEl = document.getElementById('shortcuts');
  const shortcuts = JSON.parse((shortcutsEl && shortcutsEl.dataset.shortcuts) || '[]');
  let dismissTimer;

  function formBody(extra) {
    const form = document.getElementById('dataForm');
    const body = new URLSearchParams(new FormData(form));
    body.set('session', session);
    Object.entries(extra).forEach(([key, value]) => body.set(key, value));
    return body;
  }

  function afterRender() {
    clearTimeout(dismissTimer);
    const alert = app.querySelector('.alert');
    if (!alert) return;
    alert.scrollIntoView({ behavior: 'smooth', block: 'center' });
    if (alert.dataset.autoDismiss === 'true') {
      dismissTimer = setTimeout(() => alert.remove(), 5000);
    }
  }

  function swap(html) {
    app.innerHTML = html;
    afterRender();
  }

  function showLoading(message) {
    const loading = document.getElementById('loading');
    if (!loading || !message) return;
    loading.querySelector('.spinner-text').textContent = message;
    loading.classList.add('show');
  }

  function pageServerDown() {
    const loading = document.getElementById('loading');
    if (loading) loading.classList.remove('show');
    const alerts = document.getElementById('alerts');
    if (alerts) {
      alerts.innerHTML = '<div class="alert alert-error"><strong>❌</strong> Network error - the page server did not answer</div>';
    }
  }

  function saveFile(blob, filename) {
    const url = URL.createObjectURL(blob);
    const a = document.createElement('a');
    a.href = url;
    a.download = filename;
    document.body.appendChild(a);
    a.click();
    document.body.removeChild(a);
    URL.revokeObjectURL(url);
  }

  async function run(el) {
    const extra = {};
    if (el.dataset.confirm !== undefined) {
      if (!window.confirm(el.dataset.confirm)) return;
      extra.confirmed = 'true';
    }
    const label = el.textContent;
    if (el.dataset.busyLabel) {
      el.disabled = true;
      el.textContent = el.dataset.busyLabel;
    }
    showLoading(el.dataset.loading);
    try {
      const res = await fetch(el.dataset.action, { method: 'POST', body: formBody(extra) });
      if (res.status === 410) {
        location.reload();
        return;
      }
      const filename = res.headers.get('x-filename');
      if (res.ok && filename) {
        saveFile(await res.blob(), filename);
        const view = await fetch(`/ui/view?session=${encodeURIComponent(session)}`);
        swap(await view.text());
      } else {
        swap(await res.text());
      }
    } catch (err) {
      el.disabled = false;
      el.textContent = label;
      pageServerDown();
    }
  }

  document.addEventListener('submit', (e) => e.preventDefault());

  window.addEventListener('pagehide', () => {
    navigator.sendBeacon('/ui/session/close', new URLSearchParams({ session }));
  });

  document.addEventListener('click', (e) => {
    const el = e.target.closest('button[data-action]');
    if (!el || el.disabled) return;
    e.preventDefault();
    run(el);
  });

  document.addEventListener('change', (e) => {
    const el = e.target;
    if (el.matches('select[data-action]')) {
      run(el);
    } else if (el.name === 'data_type') {
      const timeInputs = document.getElementById('timeInputs');
      if (timeInputs) timeInputs.classList.toggle('show', el.value === 'time_range');
    }
  });

  document.addEventListener('input', (e) => {
    if (e.target.id !== 'new_mac') return;
    const digits = e.target.value.replace(/[^a-fA-F0-9]/g, '').substring(0, 12);
    e.target.value = digits.replace(/(.{2})(?=.)/g, '$1:');
  });

  document.addEventListener('keydown', (e) => {
    const hit = shortcuts.find((s) => s.ctrl === e.ctrlKey && s.key === e.key);
    if (!hit) return;
    if (hit.prevent_default) e.preventDefault();
    const target = document.getElementById(hit.target);
    if (target) target.click();
  });

  function connectProgress() {
    const proto = location.protocol === 'https:' ? 'wss' : 'ws';
    const ws = new WebSocket(`${proto}://${location.host}/ws/progress?session=${encodeURIComponent(session)}`);
    ws.onmessage = (evt) => {
      const bar = document.getElementById('test_progress');
      if (!bar) return;
      const fill = bar.querySelector('.progress-fill');
      const msg = JSON.parse(evt.data);
      if (msg.kind === 'step') {
        bar.style.display = 'block';
        fill.style.width = `${msg.percent}%`;
      } else {
        setTimeout(() => {
          bar.style.display = 'none';
          fill.style.width = '0%';
        }, 1000);
      }
    };
    ws.onerror = () => ws.close();
    ws.onclose = () => setTimeout(connectProgress, 2000);
  }

  connectProgress();
  const macInput = document.getElementById('new_mac');
  if (macInput) macInput.focus();
  afterRender();
})();
"#;
