//! Call detail records from `getAccountCDRs`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

pub const CDR_METHOD: &str = "getAccountCDRs";

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;
const MAX_CODEC_LEN: usize = 20;

/// Query string of `GET /api/sippy/cdrs`
///
/// Numbers are accepted leniently: anything that does not parse is
/// treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct CdrQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub i_account: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl CdrQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(parse_int)
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.as_deref().and_then(parse_int).unwrap_or(0).max(0)
    }

    /// Struct parameter for the `getAccountCDRs` call
    ///
    /// Sippy returns the whole filtered set; `limit` and `offset` are
    /// applied locally.
    pub fn to_param(&self) -> Value {
        let mut members = IndexMap::new();

        let kind = non_empty(self.kind.as_deref()).unwrap_or("all");
        members.insert("type".to_owned(), Value::String(kind.to_owned()));

        if let Some(account) = self.i_account.as_deref().and_then(parse_int) {
            members.insert("i_account".to_owned(), Value::Int(account));
        }

        if let Some(start) = non_empty(self.start_date.as_deref()) {
            members.insert("start_date".to_owned(), Value::String(start.to_owned()));
        }

        if let Some(end) = non_empty(self.end_date.as_deref()) {
            members.insert("end_date".to_owned(), Value::String(end.to_owned()));
        }

        Value::Struct(members)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a number, truncating fractions; non-finite input is rejected
#[allow(clippy::cast_possible_truncation)]
fn parse_int(raw: &str) -> Option<i64> {
    let number: f64 = raw.trim().parse().ok()?;
    number.is_finite().then(|| number.trunc() as i64)
}

/// Page of normalized records plus the unpaginated count
#[derive(Debug)]
pub struct CdrPage {
    pub records: Vec<CallRecord>,
    pub total: usize,
}

/// Normalize every struct record and cut out the requested page
///
/// `now` fills the start time of records without a setup time.
pub fn paginate(raw: &[Value], query: &CdrQuery, now: &str) -> CdrPage {
    let records: Vec<CallRecord> = raw
        .iter()
        .filter(|record| record.as_struct().is_some())
        .map(|record| transform(record, now))
        .collect();

    let total = records.len();
    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);

    CdrPage {
        records: records.into_iter().skip(offset).take(limit).collect(),
        total,
    }
}

/// Normalized call record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub call_id: String,
    pub caller: String,
    pub callee: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub duration: f64,
    pub status: CallStatus,
    pub direction: &'static str,
    pub country: Option<String>,
    pub city: Option<String>,
    pub cost: Option<f64>,
    pub trunk: Option<String>,
    pub codec: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Completed,
    Failed,
}

/// Pull the raw CDR list out of a `getAccountCDRs` result
///
/// Sippy returns either a bare array or a struct wrapping it under
/// `cdrs` or `CDRs`.
pub fn extract_cdrs(result: &Value) -> &[Value] {
    if let Some(items) = result.as_array() {
        return items;
    }

    result
        .as_struct()
        .and_then(|members| members.get("cdrs").or_else(|| members.get("CDRs")))
        .and_then(Value::as_array)
        .unwrap_or_default()
}

/// Normalize one raw CDR
///
/// `now` fills the start time of records without a setup time.
pub fn transform(raw: &Value, now: &str) -> CallRecord {
    let empty = IndexMap::new();
    let fields = raw.as_struct().unwrap_or(&empty);

    let get = |name: &str| fields.get(name).filter(|v| v.is_truthy());
    let text = |name: &str| get(name).map(Value::to_text);

    let call_id = fields
        .get("i_xdr")
        .filter(|v| **v != Value::Nil)
        .or_else(|| fields.get("i_account").filter(|v| **v != Value::Nil))
        .map(Value::to_text)
        .unwrap_or_default();

    let succeeded = fields.get("result").and_then(Value::as_f64) == Some(0.0);

    CallRecord {
        call_id,
        caller: text("cli").or_else(|| text("cli_in")).unwrap_or_else(|| "Unknown".to_owned()),
        callee: text("cld").or_else(|| text("cld_in")).unwrap_or_else(|| "Unknown".to_owned()),
        start_time: text("setup_time").unwrap_or_else(|| now.to_owned()),
        end_time: text("connect_time"),
        duration: fields
            .get("billed_duration")
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite())
            .unwrap_or(0.0),
        status: if succeeded {
            CallStatus::Completed
        } else {
            CallStatus::Failed
        },
        direction: "outbound",
        country: text("country"),
        city: text("description"),
        cost: fields
            .get("cost")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite()),
        trunk: fields
            .get("i_account")
            .filter(|v| **v != Value::Nil)
            .map(Value::to_text),
        codec: text("codec").or_else(|| text("remote_ip").map(|ip| ip.chars().take(MAX_CODEC_LEN).collect())),
    }
}
