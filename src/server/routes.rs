use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router
};
use chrono::FixedOffset;
use log::info;

use expense_ledger::{Expense, Summary};
use expense_ledger::backend::{KeyValueStore, LocalLedgerStore};
use expense_ledger::config::AppConfig;
use expense_ledger::remote::{DocumentCollection, FirestoreCollection, RemoteExpense, RemoteLedgerStore};

use crate::error::ServerError;

pub(crate) type DynLocalStore = LocalLedgerStore<Box<dyn KeyValueStore + Send + Sync>>;
pub(crate) type DynRemoteStore = RemoteLedgerStore<Box<dyn DocumentCollection>>;

pub(crate) struct AppState {
    pub local: DynLocalStore,
    pub remote: Option<DynRemoteStore>,
    pub mirror_appends: bool,
    pub offset: FixedOffset
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<AppState> {
        let local = config.storage.open_store()?.boxed();

        let remote = config.remote.as_ref().map(|remote| {
            info!("remote collection {}/{} enabled", remote.project_id, remote.collection);
            RemoteLedgerStore::new(Box::new(FirestoreCollection::new(remote)) as Box<dyn DocumentCollection>)
        });

        return Ok(AppState {
            local,
            remote,
            mirror_appends: config.remote.as_ref().map_or(false, |remote| remote.mirror_appends),
            offset: config.summary.offset()?,
        });
    }
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/expenses", get(list_expenses).post(add_expense))
        .route("/expenses/:index", delete(delete_expense))
        .route("/summary", get(summary))
        .route("/remote/expenses", get(list_remote_expenses))
        .with_state(Arc::new(state))
}

/// Runs `op` against the local ledger on the blocking pool, since the
/// backing store does synchronous file I/O.
async fn with_local<T, F>(state: &Arc<AppState>, op: F) -> Result<T, ServerError>
where
    F: FnOnce(&DynLocalStore) -> T + Send + 'static,
    T: Send + 'static
{
    let state = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || op(&state.local)).await?;
    return Ok(result);
}

async fn list_expenses(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Expense>>, ServerError> {
    let expenses = with_local(&state, |local| local.read_all()).await?;
    return Ok(Json(expenses));
}

async fn add_expense(
    State(state): State<Arc<AppState>>,
    Json(expense): Json<Expense>
) -> Result<(StatusCode, Json<Expense>), ServerError> {
    expense.validate().map_err(ServerError::from_ledger)?;
    let record = expense.clone();
    with_local(&state, move |local| local.append(record)).await?
        .map_err(ServerError::from_ledger)?;

    if state.mirror_appends {
        if let Some(remote) = &state.remote {
            remote.save_remote(&expense).await;
        }
    }
    return Ok((StatusCode::CREATED, Json(expense)));
}

async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>
) -> Result<StatusCode, ServerError> {
    with_local(&state, move |local| local.delete_at(index)).await?
        .map_err(ServerError::from_ledger)?;
    return Ok(StatusCode::NO_CONTENT);
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<Summary>, ServerError> {
    let expenses = with_local(&state, |local| local.read_all()).await?;
    return Ok(Json(Summary::of(&expenses, &state.offset)));
}

async fn list_remote_expenses(State(state): State<Arc<AppState>>) -> Json<Vec<RemoteExpense>> {
    match &state.remote {
        Some(remote) => Json(remote.read_all_remote().await),
        None => Json(Vec::new())
    }
}
