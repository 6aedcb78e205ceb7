// src/services/eastmoney_macro.rs
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::info;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, FetchError};
use crate::models::{Observation, Series};
use super::fetcher::Fetcher;

const DATACENTER_URL: &str = "https://datacenter-web.eastmoney.com/api/data/v1/get";

/// Monthly figures are small; two years is plenty to find the latest one.
const PAGE_SIZE: &str = "24";

/// One numeric column of an Eastmoney datacenter macro report, e.g.
/// `MAKE_INDEX` (manufacturing PMI) of `RPT_ECONOMY_PMI`.
pub struct EastmoneyMacroFetcher {
    client: Client,
    report: String,
    column: String,
}

impl EastmoneyMacroFetcher {
    pub fn new(report: &str, column: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(r"^[A-Z][A-Z0-9_]*$").map_err(|e| ConfigError::InvalidTask(e.to_string()))?;
        for (what, name) in [("report", report), ("column", column)] {
            if !re.is_match(name) {
                return Err(ConfigError::InvalidTask(format!(
                    "datacenter {} name {:?} must be upper-case like RPT_ECONOMY_PMI",
                    what, name
                )));
            }
        }
        Ok(EastmoneyMacroFetcher {
            client: Client::new(),
            report: report.to_string(),
            column: column.to_string(),
        })
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("reportName", self.report.clone()),
            ("columns", format!("REPORT_DATE,{}", self.column)),
            ("sortColumns", "REPORT_DATE".to_string()),
            ("sortTypes", "-1".to_string()),
            ("pageNumber", "1".to_string()),
            ("pageSize", PAGE_SIZE.to_string()),
            ("source", "WEB".to_string()),
            ("client", "WEB".to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct DatacenterResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    result: Option<DatacenterResult>,
}

#[derive(Debug, Deserialize)]
struct DatacenterResult {
    #[serde(default)]
    data: Vec<Map<String, Value>>,
}

/// Rows come back newest first. Months without a value are skipped and the
/// result is sorted oldest first.
fn parse_report_rows(rows: &[Map<String, Value>], column: &str) -> Result<Series, FetchError> {
    let mut observations = Vec::with_capacity(rows.len());
    for row in rows {
        let value = match row.get(column) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(FetchError::parse(format!("{} is not a number: {}", column, other)))
            }
        };
        let Some(value) = value else { continue };

        let raw_date = row
            .get("REPORT_DATE")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::parse("row without REPORT_DATE"))?;
        let date = NaiveDateTime::parse_from_str(raw_date.trim(), "%Y-%m-%d %H:%M:%S")
            .map_err(|e| FetchError::parse(format!("bad REPORT_DATE {:?}: {}", raw_date, e)))?
            .date();
        observations.push(Observation::on_date(date, value));
    }

    observations.sort_by_key(|o| o.timestamp);
    Ok(observations.into_iter().collect())
}

#[async_trait]
impl Fetcher for EastmoneyMacroFetcher {
    async fn fetch(&self) -> Result<Series, FetchError> {
        info!("Fetching {} from datacenter report {}", self.column, self.report);

        let response = self
            .client
            .get(DATACENTER_URL)
            .query(&self.query())
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body: DatacenterResponse = response.json().await?;
        let result = match body.result {
            Some(result) if body.success => result,
            _ => {
                return Err(FetchError::provider(format!(
                    "datacenter report {} returned no result: {}",
                    self.report,
                    body.message.unwrap_or_default()
                )))
            }
        };

        let series = parse_report_rows(&result.data, &self.column)?;
        info!("Received {} rows of {} for {}", series.len(), self.column, self.report);
        Ok(series)
    }

    fn source(&self) -> String {
        format!("eastmoney_macro:{}:{}", self.report, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rows(body: &str) -> Vec<Map<String, Value>> {
        let response: DatacenterResponse = serde_json::from_str(body).unwrap();
        response.result.unwrap().data
    }

    #[test]
    fn newest_first_rows_become_ascending_series() {
        let body = r#"{"success":true,"message":"ok","code":0,"result":{"pages":1,"count":3,"data":[
            {"REPORT_DATE":"2024-02-01 00:00:00","TIME":"2024年02月份","MAKE_INDEX":49.1,"NMAKE_INDEX":51.4},
            {"REPORT_DATE":"2024-01-01 00:00:00","TIME":"2024年01月份","MAKE_INDEX":49.2,"NMAKE_INDEX":50.7},
            {"REPORT_DATE":"2023-12-01 00:00:00","TIME":"2023年12月份","MAKE_INDEX":49.0,"NMAKE_INDEX":50.4}
        ]}}"#;

        let series = parse_report_rows(&rows(body), "MAKE_INDEX").unwrap();

        assert_eq!(series.len(), 3);
        assert!(series.is_chronological());
        let latest = series.latest().unwrap();
        assert_eq!(latest.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(latest.value, 49.1);
    }

    #[test]
    fn months_without_a_value_are_skipped() {
        let body = r#"{"success":true,"result":{"data":[
            {"REPORT_DATE":"2024-03-01 00:00:00","MAKE_INDEX":null},
            {"REPORT_DATE":"2024-02-01 00:00:00","MAKE_INDEX":49.1}
        ]}}"#;

        let series = parse_report_rows(&rows(body), "MAKE_INDEX").unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.latest().unwrap().date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn text_value_is_a_parse_error() {
        let body = r#"{"success":true,"result":{"data":[
            {"REPORT_DATE":"2024-02-01 00:00:00","MAKE_INDEX":"49.1%"}
        ]}}"#;
        assert!(matches!(parse_report_rows(&rows(body), "MAKE_INDEX"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn failed_lookup_has_no_result() {
        let response: DatacenterResponse =
            serde_json::from_str(r#"{"success":false,"message":"返回数据为空","result":null}"#).unwrap();
        assert!(!response.success);
        assert!(response.result.is_none());
    }

    #[test]
    fn query_asks_for_recent_rows_of_one_column() {
        let fetcher = EastmoneyMacroFetcher::new("RPT_ECONOMY_PMI", "MAKE_INDEX").unwrap();
        let query = fetcher.query();

        assert!(query.contains(&("columns", "REPORT_DATE,MAKE_INDEX".to_string())));
        assert!(query.contains(&("sortTypes", "-1".to_string())));
        assert!(query.contains(&("pageSize", PAGE_SIZE.to_string())));
        assert_eq!(fetcher.source(), "eastmoney_macro:RPT_ECONOMY_PMI:MAKE_INDEX");
    }

    #[test]
    fn lower_case_names_are_rejected() {
        assert!(EastmoneyMacroFetcher::new("rpt_economy_pmi", "MAKE_INDEX").is_err());
        assert!(EastmoneyMacroFetcher::new("RPT_ECONOMY_PMI", "MAKE_INDEX,TIME").is_err());
    }
}
