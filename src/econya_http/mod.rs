use crate::{
    econya_conf,
    econya_domain::{Deal, Ledger},
    econya_link,
    econya_net::{HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE},
    econya_store::Store,
};
use chrono::Utc;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::{
    Request, Response, StatusCode,
    body::{Bytes, Incoming},
    header,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use url::form_urlencoded;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_UTM_SOURCE: &str = "econya";
const DEFAULT_UTM_MEDIUM: &str = "bons-plans";

#[derive(thiserror::Error, Debug)]
pub enum RespondError {
    #[error("serde")]
    Serde(#[from] serde_json::Error),
    #[error("http")]
    HTTP(#[from] http::Error),
}

fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    let body = serde_json::to_string(value)?;

    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Full::from(body).boxed())?)
}

fn text_response(
    status: StatusCode,
    body: &'static str,
) -> Result<Response<BoxBody<Bytes, Infallible>>, http::Error> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)
        .body(Full::from(body).boxed())
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let query = query?;

    form_urlencoded::parse(query.as_bytes())
        .find(|(param, _)| param == key)
        .map(|(_, value)| value.into_owned())
}

// ---------------------------------------------------------------------------
// Affiliate tracking: /deals, /deals/stats, /go
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DealsResponse<'a> {
    ok: bool,
    deals: &'a [Deal],
}

pub async fn deals(
    store: &dyn Store,
) -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    let catalog = store.load_catalog();

    json_response(
        StatusCode::OK,
        &DealsResponse {
            ok: true,
            deals: &catalog.deals,
        },
    )
}

#[derive(Serialize)]
struct StatsResponse<'a> {
    ok: bool,
    stats: &'a Ledger,
}

pub async fn deals_stats(
    store: &dyn Store,
) -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    let ledger = store.load_ledger();

    json_response(
        StatusCode::OK,
        &StatsResponse {
            ok: true,
            stats: &ledger,
        },
    )
}

#[derive(thiserror::Error, Debug)]
pub enum GoError {
    #[error("http")]
    HTTP(#[from] http::Error),
}

pub async fn go(
    req: Request<Incoming>,
    store: &dyn Store,
) -> Result<Response<BoxBody<Bytes, Infallible>>, GoError> {
    let query = req.uri().query();
    let id = query_param(query, "id").unwrap_or_default();
    let src = query_param(query, "src");
    let medium = query_param(query, "md");
    let campaign = query_param(query, "cm");

    handle_redirect(
        store,
        id.trim(),
        src.as_deref(),
        medium.as_deref(),
        campaign.as_deref(),
    )
}

fn handle_redirect(
    store: &dyn Store,
    id: &str,
    src: Option<&str>,
    medium: Option<&str>,
    campaign: Option<&str>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, GoError> {
    if id.is_empty() {
        return Ok(text_response(StatusCode::BAD_REQUEST, "missing id")?);
    }

    // Lookup runs before any ledger mutation; a miss must leave the
    // counters untouched.
    let catalog = store.load_catalog();
    let Some(deal) = catalog.find(id) else {
        return Ok(text_response(StatusCode::NOT_FOUND, "deal not found")?);
    };
    let Some(target) = deal.outbound_link() else {
        return Ok(text_response(StatusCode::NOT_FOUND, "deal not found")?);
    };

    let src = src.filter(|value| !value.is_empty()).unwrap_or(DEFAULT_UTM_SOURCE);
    let medium = medium.filter(|value| !value.is_empty()).unwrap_or(DEFAULT_UTM_MEDIUM);
    let campaign = campaign.filter(|value| !value.is_empty()).unwrap_or(id);

    let location = econya_link::build_tracked_link(
        target,
        &[
            ("utm_source", src),
            ("utm_medium", medium),
            ("utm_campaign", campaign),
            ("utm_content", id),
        ],
    );

    // Bookkeeping is best-effort: the visitor is leaving the site and a
    // failed disk write must not turn the redirect into an error page.
    if let Err(err) = store.record_click(id, deal.saving) {
        tracing::error!(?err, deal = id, "ledger update failed, redirecting anyway");
    }

    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Full::from("").boxed())?)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SanteResponse {
    status: &'static str,
    service: &'static str,
    ts: i64,
    version: &'static str,
}

pub async fn sante() -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    json_response(
        StatusCode::OK,
        &SanteResponse {
            status: "ok",
            service: "econya-backend",
            ts: Utc::now().timestamp_millis(),
            version: VERSION,
        },
    )
}

pub async fn ping() -> Result<Response<BoxBody<Bytes, Infallible>>, http::Error> {
    text_response(StatusCode::OK, "pong")
}

// ---------------------------------------------------------------------------
// Demo bank data: /mescomptes, /transactions
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Account {
    id: &'static str,
    name: &'static str,
    iban: &'static str,
    balance: f64,
    currency: &'static str,
}

const DEMO_ACCOUNTS: &[Account] = &[
    Account {
        id: "cc",
        name: "Compte courant",
        iban: "FR76 **** **** 1234",
        balance: 1245.32,
        currency: "EUR",
    },
    Account {
        id: "la",
        name: "Livret A",
        iban: "FR76 **** **** 5678",
        balance: 980.00,
        currency: "EUR",
    },
];

#[derive(Serialize)]
struct AccountsResponse {
    accounts: &'static [Account],
}

pub async fn mescomptes() -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    json_response(
        StatusCode::OK,
        &AccountsResponse {
            accounts: DEMO_ACCOUNTS,
        },
    )
}

#[derive(Serialize)]
struct Transaction {
    date: &'static str,
    label: &'static str,
    amount: f64,
    category: &'static str,
}

const DEMO_TX: &[Transaction] = &[
    Transaction { date: "2025-08-14", label: "Supermarché", amount: -45.90, category: "Courses" },
    Transaction { date: "2025-08-13", label: "Salaire", amount: 2000.00, category: "Revenus" },
    Transaction { date: "2025-08-10", label: "Café", amount: -2.80, category: "Sorties" },
    Transaction { date: "2025-07-28", label: "Internet", amount: -29.99, category: "Abonnements" },
    Transaction { date: "2025-07-15", label: "Essence", amount: -58.40, category: "Transport" },
];

fn is_month(raw: &str) -> bool {
    let bytes = raw.as_bytes();

    bytes.len() == 7
        && bytes[..4].iter().all(|byte| byte.is_ascii_digit())
        && bytes[4] == b'-'
        && bytes[5..].iter().all(|byte| byte.is_ascii_digit())
}

fn month_items(month: &str) -> Vec<&'static Transaction> {
    if is_month(month) {
        DEMO_TX.iter().filter(|tx| tx.date.starts_with(month)).collect()
    } else {
        DEMO_TX.iter().collect()
    }
}

#[derive(Serialize)]
struct TransactionsResponse<'a> {
    month: Option<&'a str>,
    items: Vec<&'static Transaction>,
}

pub async fn transactions(
    req: Request<Incoming>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    let month = query_param(req.uri().query(), "month").unwrap_or_default();
    let month = month.trim();

    json_response(
        StatusCode::OK,
        &TransactionsResponse {
            month: (!month.is_empty()).then_some(month),
            items: month_items(month),
        },
    )
}

// ---------------------------------------------------------------------------
// Open Banking mock: a three-step consent walkthrough plus a status probe.
// The "linked account" is a process-local flag, nothing more.
// ---------------------------------------------------------------------------

static OB_LINKED: AtomicBool = AtomicBool::new(false);

#[derive(Serialize)]
struct ObStartResponse {
    url: String,
}

fn default_ob_callback() -> String {
    format!("{}/ob/callback", econya_conf::ECONYA_PUBLIC_BASE.as_str())
}

pub async fn ob_start() -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    let callback = default_ob_callback();
    let encoded: String = form_urlencoded::byte_serialize(callback.as_bytes()).collect();
    let provider = format!(
        "{}/ob/provider?cb={}",
        econya_conf::ECONYA_PUBLIC_BASE.as_str(),
        encoded,
    );

    json_response(StatusCode::OK, &ObStartResponse { url: provider })
}

// An empty `cb=` counts as absent, like every other optional query param.
fn resolve_ob_callback(cb: Option<String>) -> String {
    cb.filter(|value| !value.is_empty())
        .unwrap_or_else(default_ob_callback)
}

pub async fn ob_provider(
    req: Request<Incoming>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, http::Error> {
    let callback = resolve_ob_callback(query_param(req.uri().query(), "cb"));

    let page = format!(
        r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Fournisseur (démo)</title></head>
<body style="font-family:system-ui;margin:40px">
  <h1>Fournisseur bancaire (démo)</h1>
  <p>Cette page simule le consentement à la connexion bancaire.</p>
  <div style="display:flex;gap:12px;margin-top:16px">
    <a href="{callback}?ok=1" style="padding:10px 14px;background:#0a7f3f;color:#fff;border-radius:8px;text-decoration:none">Autoriser</a>
    <a href="{callback}?ok=0" style="padding:10px 14px;background:#bbb;color:#222;border-radius:8px;text-decoration:none">Refuser</a>
  </div>
</body></html>"#
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HTML_CONTENT_TYPE)
        .body(Full::from(page).boxed())
}

#[derive(Serialize)]
struct ObLinkedResponse {
    linked: bool,
}

pub async fn ob_callback(
    req: Request<Incoming>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    handle_ob_callback(query_param(req.uri().query(), "ok").as_deref())
}

fn handle_ob_callback(
    ok: Option<&str>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    let linked = ok == Some("1");
    OB_LINKED.store(linked, Ordering::Relaxed);

    json_response(StatusCode::OK, &ObLinkedResponse { linked })
}

pub async fn ob_status() -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    json_response(
        StatusCode::OK,
        &ObLinkedResponse {
            linked: OB_LINKED.load(Ordering::Relaxed),
        },
    )
}

// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct NotFoundResponse {
    error: &'static str,
}

pub async fn not_found() -> Result<Response<BoxBody<Bytes, Infallible>>, RespondError> {
    json_response(StatusCode::NOT_FOUND, &NotFoundResponse { error: "not found" })
}
