// lib/src/services/listing.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use models::identifiers::non_blank;
use models::validation::parse_calendar_date;
use models::{ClinicError, ClinicResult};

use crate::clinic_store::PageRequest;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw listing query parameters as they arrive on the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    pub page: Option<String>,
    #[serde(alias = "page_size")]
    pub page_size: Option<String>,
    /// JSON object whose values take precedence over the individual parameters.
    pub filters: Option<String>,
    pub search: Option<String>,
    #[serde(alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(alias = "end_date")]
    pub end_date: Option<String>,
    #[serde(alias = "department_id")]
    pub department_id: Option<String>,
    #[serde(alias = "doctor_id")]
    pub doctor_id: Option<String>,
}

/// Keys accepted inside the appointment `filters` JSON object.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct AppointmentFilterObject {
    search: Option<String>,
    #[serde(alias = "start_date")]
    start_date: Option<String>,
    #[serde(alias = "end_date")]
    end_date: Option<String>,
    #[serde(alias = "department_id")]
    department_id: Option<String>,
    #[serde(alias = "doctor_id")]
    doctor_id: Option<String>,
}

/// Keys accepted inside the `filters` JSON object of directory listings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchFilterObject {
    search: Option<String>,
}

fn parse_filters<T: for<'de> Deserialize<'de> + Default>(raw: &Option<String>) -> ClinicResult<T> {
    match non_blank(raw.as_deref()) {
        None => Ok(T::default()),
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| ClinicError::Validation(format!("filters must be a valid JSON object: {}", e))),
    }
}

/// Picks the first non-blank value.
fn first_of(preferred: Option<String>, fallback: &Option<String>) -> Option<String> {
    non_blank(preferred.as_deref()).or_else(|| non_blank(fallback.as_deref()))
}

fn parse_bounded(field: &str, raw: &Option<String>, default: u32, max: u32) -> ClinicResult<u32> {
    let Some(raw) = non_blank(raw.as_deref()) else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(value) if (1..=max).contains(&value) => Ok(value),
        _ if max == u32::MAX => Err(ClinicError::Validation(format!("{field} must be a positive integer"))),
        _ => Err(ClinicError::Validation(format!("{field} must be an integer between 1 and {max}"))),
    }
}

/// Page coordinates of a validated listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Paging { page: DEFAULT_PAGE, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl Paging {
    /// Absent values take the defaults; anything present must be in range.
    pub fn parse(params: &ListingParams) -> ClinicResult<Self> {
        Ok(Paging {
            page: parse_bounded("page", &params.page, DEFAULT_PAGE, u32::MAX)?,
            page_size: parse_bounded("pageSize", &params.page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?,
        })
    }

    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// One page of a listing plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, paging: Paging, total: u64) -> Self {
        Page { data, meta: PageMeta { page: paging.page, page_size: paging.page_size, total } }
    }

    pub fn empty(paging: Paging) -> Self {
        Self::new(Vec::new(), paging, 0)
    }
}

/// Canonical appointment listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub paging: Paging,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub department_id: Option<String>,
    pub doctor_id: Option<String>,
}

impl AppointmentQuery {
    pub fn from_params(params: &ListingParams) -> ClinicResult<Self> {
        let filters: AppointmentFilterObject = parse_filters(&params.filters)?;
        let paging = Paging::parse(params)?;

        let start_date = first_of(filters.start_date, &params.start_date)
            .map(|v| parse_calendar_date("startDate", &v))
            .transpose()?;
        let end_date = first_of(filters.end_date, &params.end_date)
            .map(|v| parse_calendar_date("endDate", &v))
            .transpose()?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(ClinicError::validation("startDate must be on or before endDate"));
            }
        }

        Ok(AppointmentQuery {
            paging,
            search: first_of(filters.search, &params.search),
            start_date,
            end_date,
            department_id: first_of(filters.department_id, &params.department_id),
            doctor_id: first_of(filters.doctor_id, &params.doctor_id),
        })
    }
}

/// Canonical request for the searchable staff directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryQuery {
    pub paging: Paging,
    pub search: Option<String>,
}

impl DirectoryQuery {
    pub fn from_params(params: &ListingParams) -> ClinicResult<Self> {
        let filters: SearchFilterObject = parse_filters(&params.filters)?;
        Ok(DirectoryQuery { paging: Paging::parse(params)?, search: first_of(filters.search, &params.search) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListingParams {
        ListingParams::default()
    }

    #[test]
    fn should_default_paging_only_when_absent() {
        let query = AppointmentQuery::from_params(&params()).unwrap();
        assert_eq!(query.paging, Paging { page: 1, page_size: 20 });

        for (page, size) in [("0", "20"), ("abc", "20"), ("1", "0"), ("1", "101"), ("-1", "20")] {
            let p = ListingParams { page: Some(page.into()), page_size: Some(size.into()), ..params() };
            assert!(matches!(AppointmentQuery::from_params(&p), Err(ClinicError::Validation(_))), "{page}/{size}");
        }
        let blank = ListingParams { page: Some(" ".into()), ..params() };
        assert_eq!(AppointmentQuery::from_params(&blank).unwrap().paging.page, 1);
    }

    #[test]
    fn json_filters_win_and_parameters_fill_gaps() {
        let p = ListingParams {
            filters: Some(r#"{"department_id":"d1","search":"  smith "}"#.into()),
            department_id: Some("d9".into()),
            doctor_id: Some("doc-2".into()),
            search: Some("ignored".into()),
            ..params()
        };
        let query = AppointmentQuery::from_params(&p).unwrap();
        assert_eq!(query.department_id.as_deref(), Some("d1"));
        assert_eq!(query.doctor_id.as_deref(), Some("doc-2"));
        assert_eq!(query.search.as_deref(), Some("smith"));
    }

    #[test]
    fn camel_and_snake_aliases_are_equivalent() {
        let camel = ListingParams { filters: Some(r#"{"doctorId":"x","startDate":"2024-01-01"}"#.into()), ..params() };
        let snake = ListingParams { filters: Some(r#"{"doctor_id":"x","start_date":"2024-01-01"}"#.into()), ..params() };
        assert_eq!(
            AppointmentQuery::from_params(&camel).unwrap(),
            AppointmentQuery::from_params(&snake).unwrap()
        );
    }

    #[test]
    fn malformed_or_unknown_filters_are_rejected() {
        for raw in ["{not json", r#"{"dept":"d1"}"#, "[1,2]"] {
            let p = ListingParams { filters: Some(raw.into()), ..params() };
            assert!(matches!(AppointmentQuery::from_params(&p), Err(ClinicError::Validation(_))), "{raw}");
        }
    }

    #[test]
    fn dates_must_exist_and_be_ordered() {
        let bad = ListingParams { start_date: Some("2024-02-30".into()), ..params() };
        assert!(AppointmentQuery::from_params(&bad).is_err());

        let inverted = ListingParams {
            start_date: Some("2024-03-02".into()),
            end_date: Some("2024-03-01".into()),
            ..params()
        };
        assert!(AppointmentQuery::from_params(&inverted).is_err());

        let same_day = ListingParams {
            start_date: Some("2024-03-01".into()),
            end_date: Some("2024-03-01".into()),
            ..params()
        };
        assert!(AppointmentQuery::from_params(&same_day).is_ok());
    }

    #[test]
    fn directory_filters_only_know_search() {
        let ok = ListingParams { filters: Some(r#"{"search":"ann"}"#.into()), ..params() };
        assert_eq!(DirectoryQuery::from_params(&ok).unwrap().search.as_deref(), Some("ann"));
        let unknown = ListingParams { filters: Some(r#"{"doctorId":"x"}"#.into()), ..params() };
        assert!(DirectoryQuery::from_params(&unknown).is_err());
    }
}
