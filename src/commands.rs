// Subcommand execution
// Results go to `out` as JSON; diagnostics go through tracing to stderr

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;

use crate::auth::{
    token, AccessToken, CognitoClient, IdentityProvider, TokenRenewer, TokenStatus,
    RENEWAL_BUFFER_SECS,
};
use crate::config::{Command, Config};
use crate::dry_run;
use crate::error::{CatalysisError, Result};
use crate::graphql::AuthFailureSignal;
use crate::http_client::{ApiTransport, GraphQlHttpClient};
use crate::invoker::AuthenticatedInvoker;
use crate::operations::{
    DateRange, Operation, QueryStore, Resolution, DOCUMENTS, WEIGHT_WINDOW_DAYS,
};
use crate::summary;

/// Run one subcommand against the real endpoints
pub async fn run<W: Write>(config: &Config, command: Command, out: &mut W) -> Result<()> {
    config.validate_for(&command)?;

    match command {
        Command::Check => check(config, out),
        Command::TokenInfo => token_info(&config.access_token()?, Utc::now(), out),
        Command::Refresh { dry_run } if dry_run.enabled => write_json(
            out,
            &dry_run::render_renewal_request(&config.idp_url, &config.credentials),
        ),
        Command::Refresh { .. } => {
            let provider = CognitoClient::new(config.idp_url.clone(), config.http_timeout)?;
            let renewer = TokenRenewer::new(provider, &config.credentials);
            refresh(&renewer, out).await
        }
        Command::Summary { dry_run } => {
            let invoker = build_invoker(config)?;
            household_summary(&invoker, config, dry_run.enabled, today(), out).await
        }
        other => {
            let operation = operation_for(&other, today())?.ok_or_else(|| {
                CatalysisError::Internal(anyhow::anyhow!("{:?} is not a data command", other))
            })?;
            let invoker = build_invoker(config)?;
            run_operation(&invoker, config, &operation, other.is_dry_run(), out).await?;
            Ok(())
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn build_invoker(config: &Config) -> Result<AuthenticatedInvoker<GraphQlHttpClient, CognitoClient>> {
    let transport = GraphQlHttpClient::new(config.api_url.clone(), config.http_timeout)?;
    let provider = CognitoClient::new(config.idp_url.clone(), config.http_timeout)?;
    Ok(AuthenticatedInvoker::new(
        transport,
        TokenRenewer::new(provider, &config.credentials),
    ))
}

/// Translate a data-fetching subcommand into its operation
pub fn operation_for(command: &Command, today: NaiveDate) -> Result<Option<Operation>> {
    let operation = match command {
        Command::Status { .. } => Operation::Status,
        Command::Weight {
            cat_id,
            start_date,
            end_date,
            resolution,
            ..
        } => {
            let end = end_date.unwrap_or(today);
            let range = match start_date {
                Some(start) => DateRange::new(*start, end)?,
                None => DateRange::trailing(end, WEIGHT_WINDOW_DAYS),
            };
            Operation::Weight {
                cat_id: cat_id.clone(),
                range,
                resolution: *resolution,
            }
        }
        Command::Alerts {
            cat_id,
            start_date,
            end_date,
            page_size,
            ..
        } => Operation::Alerts {
            cat_id: cat_id.clone(),
            range: DateRange::new(*start_date, *end_date)?,
            page_size: *page_size,
        },
        Command::Insights {
            cat_id,
            current_start,
            current_end,
            previous_start,
            previous_end,
            ..
        } => Operation::Insights {
            cat_id: cat_id.clone(),
            current: DateRange::new(*current_start, *current_end)?,
            previous: DateRange::new(*previous_start, *previous_end)?,
        },
        Command::Events {
            start,
            end,
            page_size,
            ..
        } => {
            if start > end {
                return Err(CatalysisError::Configuration(format!(
                    "start {} is after end {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
            Operation::Events {
                start: *start,
                end: *end,
                page_size: *page_size,
            }
        }
        Command::Refresh { .. } | Command::TokenInfo | Command::Summary { .. } | Command::Check => {
            return Ok(None)
        }
    };

    Ok(Some(operation))
}

/// Run one operation, or render it when `dry_run` is set
///
/// Returns the access token in effect afterwards.
pub async fn run_operation<T, P, W>(
    invoker: &AuthenticatedInvoker<T, P>,
    config: &Config,
    operation: &Operation,
    dry_run: bool,
    out: &mut W,
) -> Result<AccessToken>
where
    T: ApiTransport,
    P: IdentityProvider,
    W: Write,
{
    let token = config.access_token()?;
    let request = QueryStore::new(&config.queries_dir).request(operation)?;

    if dry_run {
        let rendered =
            dry_run::render_api_request(&config.api_url, &request, &token, &config.credentials);
        write_json(out, &rendered)?;
        return Ok(token);
    }

    let invocation = invoker.execute(token, request).await?;
    write_json(out, &invocation.response)?;
    Ok(invocation.access_token)
}

/// Overview plus the latest weight of each cat
pub async fn household_summary<T, P, W>(
    invoker: &AuthenticatedInvoker<T, P>,
    config: &Config,
    dry_run: bool,
    today: NaiveDate,
    out: &mut W,
) -> Result<()>
where
    T: ApiTransport,
    P: IdentityProvider,
    W: Write,
{
    let store = QueryStore::new(&config.queries_dir);
    let mut token = config.access_token()?;
    let status_request = store.request(&Operation::Status)?;

    if dry_run {
        let rendered = dry_run::render_api_request(
            &config.api_url,
            &status_request,
            &token,
            &config.credentials,
        );
        return write_json(out, &rendered);
    }

    let status = invoker.execute(token, status_request).await?;
    if let Some(errors) = status.response.get("errors") {
        tracing::warn!(errors = %errors, "Status response carried errors");

        let household_missing = status
            .response
            .pointer("/data/authenticate/myHousehold")
            .map_or(true, Value::is_null);
        if household_missing || AuthFailureSignal::detect(&status.response).is_some() {
            // Nothing to summarize; hand the API's answer back unchanged
            return write_json(out, &status.response);
        }
    }
    token = status.access_token;

    let mut household = summary::household(&status.response);
    let range = DateRange::trailing(today, WEIGHT_WINDOW_DAYS);

    for cat in &mut household.cats {
        let Some(cat_id) = cat.id.clone() else {
            tracing::warn!(name = ?cat.name, "Cat has no id, skipping weight");
            continue;
        };
        let request = store.request(&Operation::Weight {
            cat_id: cat_id.clone(),
            range,
            resolution: Resolution::Day,
        })?;

        match invoker.execute(token.clone(), request).await {
            Ok(weight) => {
                cat.weight_lbs = summary::latest_weight_lbs(&weight.response);
                token = weight.access_token;
                tracing::debug!(cat = %cat_id, weight_lbs = ?cat.weight_lbs, "Updated weight");
            }
            Err(e) => {
                tracing::error!("Failed to fetch weight for cat {}: {}", cat_id, e);
            }
        }
    }

    write_json(out, &household)
}

/// Force a renewal and print the new token
///
/// Unlike every other output, the access token is written unredacted: it is
/// the result the operator asked for.
pub async fn refresh<P, W>(renewer: &TokenRenewer<P>, out: &mut W) -> Result<()>
where
    P: IdentityProvider,
    W: Write,
{
    let renewed = renewer.renew().await?;
    let expires_at = token::decode_claims(&renewed)
        .ok()
        .and_then(|claims| DateTime::from_timestamp(claims.exp, 0))
        .map(|at| at.to_rfc3339());

    write_json(
        out,
        &json!({
            "accessToken": renewed.as_str(),
            "expiresAt": expires_at,
        }),
    )
}

/// Report claims and freshness of `access_token` at `now`; never renews
pub fn token_info<W: Write>(access_token: &AccessToken, now: DateTime<Utc>, out: &mut W) -> Result<()> {
    let status = token::inspect_at(access_token, now);
    match &status {
        TokenStatus::Fresh { .. } => tracing::info!("{}", status.describe()),
        _ => tracing::warn!("{}", status.describe()),
    }

    let mut report = json!({
        "status": status.label(),
        "tokenPreview": access_token.preview(),
        "renewalBufferSeconds": RENEWAL_BUFFER_SECS,
    });

    match (&status, token::decode_claims(access_token)) {
        (TokenStatus::Unparseable { reason }, _) => {
            report["reason"] = json!(reason);
        }
        (TokenStatus::Fresh { expires_at, .. } | TokenStatus::Stale { expires_at, .. }, Ok(claims)) => {
            report["expiresAt"] = json!(expires_at.to_rfc3339());
            report["secondsRemaining"] = json!(claims.exp - now.timestamp());
            report["claims"] = serde_json::to_value(&claims).map_err(anyhow::Error::from)?;
        }
        (_, Err(e)) => {
            report["reason"] = json!(e.to_string());
        }
    }

    write_json(out, &report)
}

/// Verify the local setup without touching the network
pub fn check<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    let store = QueryStore::new(&config.queries_dir);
    let missing = store.missing();

    let documents: Vec<Value> = DOCUMENTS
        .iter()
        .map(|doc| {
            let path = store.path(doc);
            json!({ "document": doc, "present": path.is_file(), "path": path.display().to_string() })
        })
        .collect();

    let creds = &config.credentials;
    write_json(
        out,
        &json!({
            "queriesDir": store.dir().display().to_string(),
            "queriesDirExists": store.dir().is_dir(),
            "documents": documents,
            "environment": {
                "PETIVITY_JWT": creds.access_token.is_some(),
                "PETIVITY_CLIENT_ID": creds.client_id.is_some(),
                "PETIVITY_REFRESH_TOKEN": creds.refresh_token.is_some(),
            }
        }),
    )?;

    match missing.into_iter().next() {
        Some(path) => Err(CatalysisError::QueryDocumentMissing(path)),
        None => Ok(()),
    }
}

fn write_json<W: Write, S: Serialize + ?Sized>(out: &mut W, value: &S) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("Failed to serialize output")?;
    writeln!(out).context("Failed to write output")?;
    Ok(())
}
