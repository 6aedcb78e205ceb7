// src/services/treasury.rs
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use csv::Reader;
use log::{info, warn};
use reqwest::Client;

use crate::error::FetchError;
use crate::models::{Observation, Series};
use super::fetcher::Fetcher;

/// One column of the Treasury daily rates CSV for the current year, e.g.
/// `daily_treasury_bill_rates` / `"4 Wk"` or `daily_treasury_yield_curve` /
/// `"20 Yr"`.
pub struct TreasuryCsvFetcher {
    client: Client,
    rate_type: String,
    column: String,
}

impl TreasuryCsvFetcher {
    pub fn new(rate_type: impl Into<String>, column: impl Into<String>) -> Self {
        TreasuryCsvFetcher {
            client: Client::new(),
            rate_type: rate_type.into(),
            column: column.into(),
        }
    }

    fn url(&self, year: i32) -> String {
        format!(
            "https://home.treasury.gov/resource-center/data-chart-center/interest-rates/\
daily-treasury-rates.csv/{year}/all?_format=csv\
&field_tdr_date_value={year}\
&type={rate_type}",
            year = year,
            rate_type = self.rate_type
        )
    }
}

/// Parses the CSV into an ascending series. The file lists the most recent
/// date first; rows with a blank cell in `column` are skipped.
pub fn parse_rates_csv(csv_text: &str, column: &str) -> Result<Series, FetchError> {
    let mut rdr = Reader::from_reader(csv_text.as_bytes());

    let headers = rdr.headers()?.clone();
    let idx_date = headers
        .iter()
        .position(|h| h.trim() == "Date")
        .ok_or_else(|| FetchError::parse("No 'Date' column in Treasury CSV"))?;
    let idx_value = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| FetchError::parse(format!("No '{}' column in Treasury CSV", column)))?;

    let mut observations = Vec::new();
    for record in rdr.records() {
        let row = record?;
        let cell = row.get(idx_value).unwrap_or("").trim();
        if cell.is_empty() || cell == "N/A" {
            continue;
        }
        let raw_date = row
            .get(idx_date)
            .ok_or_else(|| FetchError::parse("Missing 'Date' field"))?
            .trim();
        let date = NaiveDate::parse_from_str(raw_date, "%m/%d/%Y")
            .map_err(|e| FetchError::parse(format!("Invalid Treasury date '{}': {}", raw_date, e)))?;
        let rate = cell
            .parse::<f64>()
            .map_err(|e| FetchError::parse(format!("Invalid '{}' value '{}': {}", column, cell, e)))?;
        observations.push(Observation::on_date(date, rate));
    }

    observations.reverse();
    Ok(Series::new(observations))
}

#[async_trait]
impl Fetcher for TreasuryCsvFetcher {
    async fn fetch(&self) -> Result<Series, FetchError> {
        let url = self.url(Utc::now().year());
        info!("Fetching Treasury CSV from URL: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let csv_text = response.text().await?;
        let series = parse_rates_csv(&csv_text, &self.column)?;
        if series.is_empty() {
            warn!("Treasury CSV has no '{}' rows yet this year", self.column);
        }
        Ok(series)
    }

    fn source(&self) -> String {
        format!("treasury:{}:{}", self.rate_type, self.column)
    }
}
