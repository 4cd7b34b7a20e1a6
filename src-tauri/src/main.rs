#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use allocation_survey::{
    init_logging, AdminGate, AdminPanel, AdminReport, Receipt, ResponseStore, Summary,
    SurveyConfig, SurveySession, ARCHIVE_FILENAME, BUDGET, CATEGORIES, ITEMS,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tauri::{Manager, State};

const MASTER_DOWNLOAD_NAME: &str = "responses.csv";

struct AppState {
    session: Mutex<SurveySession>,
    gate: AdminGate,
    panel: AdminPanel,
    data_dir: PathBuf,
}

#[derive(Serialize)]
struct SaveFileResult {
    ok: bool,
    canceled: bool,
    filename: String,
    path: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct AllocationSetRequest {
    category: String,
    item: String,
    amount: i64,
}

#[derive(Deserialize)]
struct AdminKeyRequest {
    key: String,
}

#[tauri::command]
fn catalog_get() -> serde_json::Value {
    json!({
        "categories": CATEGORIES,
        "items": ITEMS,
        "budget": BUDGET,
    })
}

#[tauri::command]
fn allocation_set(state: State<'_, AppState>, payload: AllocationSetRequest) -> Result<Summary, String> {
    let mut session = state.session.lock().map_err(|err| err.to_string())?;
    session
        .set(payload.category.as_str(), payload.item.as_str(), payload.amount)
        .map_err(|err| err.to_string())
}

#[tauri::command]
fn allocation_clear(state: State<'_, AppState>) -> Result<Summary, String> {
    let mut session = state.session.lock().map_err(|err| err.to_string())?;
    Ok(session.clear())
}

#[tauri::command]
fn allocation_summary(state: State<'_, AppState>) -> Result<serde_json::Value, String> {
    let session = state.session.lock().map_err(|err| err.to_string())?;
    Ok(json!({
        "summary": session.summary(),
        "submitted": session.store().is_submitted(),
        "entries": session.store().allocation().entries().collect::<Vec<_>>(),
    }))
}

#[tauri::command]
fn survey_submit(state: State<'_, AppState>) -> Result<Receipt, String> {
    let mut session = state.session.lock().map_err(|err| err.to_string())?;
    session.submit().map_err(|err| err.to_string())
}

#[tauri::command]
fn personal_copy_save(state: State<'_, AppState>) -> Result<SaveFileResult, String> {
    let receipt = {
        let session = state.session.lock().map_err(|err| err.to_string())?;
        session.last_receipt().cloned()
    };
    let Some(receipt) = receipt else {
        return Err("No submitted allocation to download.".to_string());
    };
    save_with_dialog(
        receipt.personal_copy_filename.as_str(),
        receipt.personal_copy.as_bytes(),
    )
}

#[tauri::command]
fn admin_status(state: State<'_, AppState>) -> serde_json::Value {
    json!({
        "configured": state.gate.is_configured(),
        "hint": state.gate.hint(),
        "folder": state.data_dir.to_string_lossy().to_string(),
    })
}

#[tauri::command]
fn admin_report(state: State<'_, AppState>, payload: AdminKeyRequest) -> Result<AdminReport, String> {
    require_admin(&state, payload.key.as_str())?;
    Ok(state.panel.report())
}

#[tauri::command]
fn admin_master_save(state: State<'_, AppState>, payload: AdminKeyRequest) -> Result<SaveFileResult, String> {
    require_admin(&state, payload.key.as_str())?;
    let bytes = state.panel.master_bytes().map_err(|err| err.to_string())?;
    save_with_dialog(MASTER_DOWNLOAD_NAME, bytes.as_slice())
}

#[tauri::command]
fn admin_archive_save(state: State<'_, AppState>, payload: AdminKeyRequest) -> Result<SaveFileResult, String> {
    require_admin(&state, payload.key.as_str())?;
    let bytes = state
        .panel
        .submissions_archive()
        .map_err(|err| err.to_string())?;
    save_with_dialog(ARCHIVE_FILENAME, bytes.as_slice())
}

fn require_admin(state: &AppState, key: &str) -> Result<(), String> {
    if state.gate.unlock(key) {
        return Ok(());
    }
    if let Some(hint) = state.gate.hint() {
        return Err(hint);
    }
    Err("Invalid admin key.".to_string())
}

fn save_with_dialog(filename: &str, content: &[u8]) -> Result<SaveFileResult, String> {
    let default_name = sanitize_filename(filename);
    let path = rfd::FileDialog::new()
        .set_file_name(default_name.as_str())
        .save_file();

    let Some(path) = path else {
        return Ok(SaveFileResult {
            ok: false,
            canceled: true,
            filename: default_name,
            path: None,
            error: None,
        });
    };

    if let Err(error) = write_file(path.clone(), content) {
        return Ok(SaveFileResult {
            ok: false,
            canceled: false,
            filename: default_name,
            path: Some(path.to_string_lossy().to_string()),
            error: Some(error),
        });
    }
    Ok(SaveFileResult {
        ok: true,
        canceled: false,
        filename: default_name,
        path: Some(path.to_string_lossy().to_string()),
        error: None,
    })
}

fn write_file(path: PathBuf, content: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    fs::write(path, content).map_err(|err| err.to_string())
}

fn sanitize_filename(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "survey-export.csv".to_string()
    } else {
        trimmed.to_string()
    }
}

fn main() {
    init_logging();
    tauri::Builder::default()
        .setup(|app| {
            let default_dir = app.path().app_data_dir()?.join("AllocationSurvey");
            let config = SurveyConfig::resolve(default_dir);
            fs::create_dir_all(config.data_dir.as_path())?;
            let responses = ResponseStore::new(config.data_dir.as_path());
            app.manage(AppState {
                session: Mutex::new(SurveySession::new(responses.clone())),
                gate: AdminGate::new(config.admin_secret),
                panel: AdminPanel::new(responses),
                data_dir: config.data_dir,
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            catalog_get,
            allocation_set,
            allocation_clear,
            allocation_summary,
            survey_submit,
            personal_copy_save,
            admin_status,
            admin_report,
            admin_master_save,
            admin_archive_save
        ])
        .run(tauri::generate_context!())
        .expect("failed to run Allocation Survey");
}
