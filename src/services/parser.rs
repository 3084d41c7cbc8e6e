//! BOM précis forecast XML parser.
//!
//! Extracts structured per-day forecast data from a BOM product document:
//! - issue metadata from `<amoc>`: product identifier, issue time, timezone
//! - the `<area type="location">` element's description (city name)
//! - one `ForecastDay` per `<forecast-period>` inside that area
//!
//! Structural failures (missing amoc, identifier, issue time, forecast
//! section or location area) make the whole document unparsable. A single
//! malformed forecast-period only skips that period.

use chrono::{DateTime, FixedOffset, NaiveDate};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A single day's forecast extracted from the XML.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    /// The date this forecast is for (from `start-time-local`)
    pub forecast_date: NaiveDate,
    /// BOM forecast icon code (`element type="forecast_icon_code"`)
    pub icon_code: Option<i32>,
    /// Minimum temperature in °C (`element type="air_temperature_minimum"`)
    pub temp_min: Option<i32>,
    /// Maximum temperature in °C (`element type="air_temperature_maximum"`)
    pub temp_max: Option<i32>,
    /// Probability of precipitation text (`text type="probability_of_precipitation"`)
    pub precipitation_prob: Option<String>,
    /// Short summary text (`text type="precis"`)
    pub precis: Option<String>,
    /// Long-form forecast text (`text type="forecast"`)
    pub forecast: Option<String>,
}

/// A complete parsed BOM forecast document.
#[derive(Debug, Clone)]
pub struct ParsedForecast {
    /// BOM Product ID from `<amoc><identifier>`
    pub product_id: String,
    /// City name from the location area's `description` attribute
    pub city_name: String,
    /// When the forecast was issued (`<issue-time-local>`)
    pub issue_time: DateTime<FixedOffset>,
    /// Timezone abbreviation from the issue time's `tz` attribute
    pub timezone: String,
    /// Per-day forecasts in document order
    pub forecasts: Vec<ForecastDay>,
}

/// Fields captured while inside one `<forecast-period>` element.
#[derive(Debug, Default)]
struct PeriodState {
    forecast_date: Option<NaiveDate>,
    icon_code: Option<i32>,
    temp_min: Option<i32>,
    temp_max: Option<i32>,
    precipitation_prob: Option<String>,
    precis: Option<String>,
    forecast: Option<String>,
}

impl PeriodState {
    /// Finalize into a `ForecastDay`; `None` if the period had no usable date.
    fn finish(self) -> Option<ForecastDay> {
        let forecast_date = self.forecast_date?;
        Some(ForecastDay {
            forecast_date,
            icon_code: self.icon_code,
            temp_min: self.temp_min,
            temp_max: self.temp_max,
            precipitation_prob: self.precipitation_prob,
            precis: self.precis,
            forecast: self.forecast,
        })
    }
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
        }
    }
    None
}

/// Parse BOM forecast XML and extract structured forecast data.
///
/// Returns `None` (with an error log) when the document is structurally
/// incomplete; the caller records a per-location parse failure.
pub fn parse_forecast_xml(xml: &str) -> Option<ParsedForecast> {
    let mut reader = Reader::from_str(xml);

    let mut product_id: Option<String> = None;
    let mut issue_time: Option<DateTime<FixedOffset>> = None;
    let mut timezone: Option<String> = None;
    let mut city_name: Option<String> = None;
    let mut forecasts: Vec<ForecastDay> = Vec::new();

    // Nesting context
    let mut in_amoc = false;
    let mut saw_forecast_section = false;
    let mut in_location_area = false;
    let mut period: Option<PeriodState> = None;

    // Name of the element whose text content we are waiting for
    let mut current_element: Option<String> = None;

    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf);
        // Self-closing elements never produce an End event, so any state an
        // opening tag would normally set (and an End would clear) must be
        // resolved here instead.
        let is_empty = matches!(event, Ok(Event::Empty(_)));
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.name().as_ref() {
                    b"amoc" => {
                        in_amoc = !is_empty;
                    }
                    b"identifier" if in_amoc && !is_empty => {
                        current_element = Some("identifier".to_string());
                    }
                    b"issue-time-local" if in_amoc => {
                        timezone = attr_value(e, "tz");
                        if !is_empty {
                            current_element = Some("issue_time".to_string());
                        }
                    }
                    b"forecast" => {
                        saw_forecast_section = true;
                    }
                    b"area" if saw_forecast_section => {
                        // Only the first area with type="location" is used
                        if city_name.is_none()
                            && attr_value(e, "type").as_deref() == Some("location")
                        {
                            city_name = attr_value(e, "description");
                            if city_name.is_none() {
                                tracing::error!("Location area missing description attribute");
                                return None;
                            }
                            // A self-closing location area has no children;
                            // leaving the flag unset keeps later sibling
                            // areas' periods out of the result.
                            in_location_area = !is_empty;
                        }
                    }
                    b"forecast-period" if in_location_area => {
                        let mut state = PeriodState::default();
                        match attr_value(e, "start-time-local") {
                            Some(start) => {
                                match DateTime::parse_from_rfc3339(&start) {
                                    Ok(dt) => state.forecast_date = Some(dt.date_naive()),
                                    Err(err) => {
                                        tracing::warn!(
                                            "Invalid date format in forecast period: {} - {}",
                                            start,
                                            err
                                        );
                                    }
                                }
                            }
                            None => {
                                tracing::warn!(
                                    "Forecast period missing start-time-local attribute"
                                );
                            }
                        }
                        if is_empty {
                            // A self-closing period still records its date,
                            // with every forecast field absent.
                            if let Some(day) = state.finish() {
                                forecasts.push(day);
                            }
                        } else {
                            period = Some(state);
                        }
                    }
                    b"element" if period.is_some() && !is_empty => {
                        if let Some(kind) = attr_value(e, "type") {
                            current_element = Some(format!("element:{}", kind));
                        }
                    }
                    b"text" if period.is_some() && !is_empty => {
                        if let Some(kind) = attr_value(e, "type") {
                            current_element = Some(format!("text:{}", kind));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(ref elem) = current_element {
                    let text = e.unescape().unwrap_or_default().trim().to_string();
                    if !text.is_empty() {
                        match elem.as_str() {
                            "identifier" => product_id = Some(text),
                            "issue_time" => match DateTime::parse_from_rfc3339(&text) {
                                Ok(dt) => issue_time = Some(dt),
                                Err(err) => {
                                    tracing::error!(
                                        "Invalid issue-time-local format: {} - {}",
                                        text,
                                        err
                                    );
                                    return None;
                                }
                            },
                            "element:forecast_icon_code" => {
                                if let Some(p) = period.as_mut() {
                                    p.icon_code = parse_int_value(&text, "icon_code");
                                }
                            }
                            "element:air_temperature_minimum" => {
                                if let Some(p) = period.as_mut() {
                                    p.temp_min = parse_int_value(&text, "temp_min");
                                }
                            }
                            "element:air_temperature_maximum" => {
                                if let Some(p) = period.as_mut() {
                                    p.temp_max = parse_int_value(&text, "temp_max");
                                }
                            }
                            "text:probability_of_precipitation" => {
                                if let Some(p) = period.as_mut() {
                                    p.precipitation_prob = Some(text);
                                }
                            }
                            "text:precis" => {
                                if let Some(p) = period.as_mut() {
                                    p.precis = Some(text);
                                }
                            }
                            "text:forecast" => {
                                if let Some(p) = period.as_mut() {
                                    p.forecast = Some(text);
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                current_element = None;
                match e.name().as_ref() {
                    b"amoc" => {
                        in_amoc = false;
                    }
                    b"area" if in_location_area => {
                        in_location_area = false;
                    }
                    b"forecast-period" => {
                        if let Some(day) = period.take().and_then(PeriodState::finish) {
                            forecasts.push(day);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::error!("Failed to parse XML: {}", e);
                return None;
            }
            _ => {}
        }
        buf.clear();
    }

    let product_id = match product_id {
        Some(id) => id,
        None => {
            tracing::error!("XML missing identifier in amoc section");
            return None;
        }
    };
    let issue_time = match issue_time {
        Some(t) => t,
        None => {
            tracing::error!("XML missing issue-time-local in amoc section");
            return None;
        }
    };
    if !saw_forecast_section {
        tracing::error!("XML missing forecast section");
        return None;
    }
    let city_name = match city_name {
        Some(name) => name,
        None => {
            tracing::error!("XML missing location area (type='location')");
            return None;
        }
    };

    if forecasts.is_empty() {
        tracing::warn!("No valid forecast periods found for {}", product_id);
    }

    Some(ParsedForecast {
        product_id,
        city_name,
        issue_time,
        timezone: timezone.unwrap_or_default(),
        forecasts,
    })
}

/// Parse an integer element value, logging and discarding malformed text.
fn parse_int_value(text: &str, field: &str) -> Option<i32> {
    match text.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Invalid {} value: {}", field, text);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<product version="1.7">
  <amoc>
    <identifier>IDN10064</identifier>
    <issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local>
  </amoc>
  <forecast>
    <area aac="NSW_FA001" description="New South Wales" type="region"/>
    <area aac="NSW_ME001" description="Sydney" type="location">
      <forecast-period index="0" start-time-local="2025-06-01T00:00:00+10:00">
        <element type="forecast_icon_code">3</element>
        <element type="air_temperature_maximum" units="Celsius">24</element>
        <text type="precis">Partly cloudy.</text>
        <text type="probability_of_precipitation">40%</text>
        <text type="forecast">Partly cloudy. Light winds.</text>
      </forecast-period>
      <forecast-period index="1" start-time-local="2025-06-02T00:00:00+10:00">
        <element type="forecast_icon_code">16</element>
        <element type="air_temperature_minimum" units="Celsius">12</element>
        <element type="air_temperature_maximum" units="Celsius">21</element>
        <text type="precis">Showers.</text>
      </forecast-period>
    </area>
  </forecast>
</product>"#;

    #[test]
    fn test_parse_full_document() {
        let parsed = parse_forecast_xml(SAMPLE_XML).unwrap();
        assert_eq!(parsed.product_id, "IDN10064");
        assert_eq!(parsed.city_name, "Sydney");
        assert_eq!(parsed.timezone, "EST");
        assert_eq!(parsed.forecasts.len(), 2);

        let day0 = &parsed.forecasts[0];
        assert_eq!(
            day0.forecast_date,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert_eq!(day0.icon_code, Some(3));
        assert_eq!(day0.temp_min, None);
        assert_eq!(day0.temp_max, Some(24));
        assert_eq!(day0.precipitation_prob.as_deref(), Some("40%"));
        assert_eq!(day0.precis.as_deref(), Some("Partly cloudy."));
        assert_eq!(day0.forecast.as_deref(), Some("Partly cloudy. Light winds."));

        let day1 = &parsed.forecasts[1];
        assert_eq!(day1.temp_min, Some(12));
        assert_eq!(day1.precipitation_prob, None);
    }

    #[test]
    fn test_region_area_is_ignored() {
        // The first area in the sample is type="region"; its description must
        // not leak into city_name.
        let parsed = parse_forecast_xml(SAMPLE_XML).unwrap();
        assert_eq!(parsed.city_name, "Sydney");
    }

    #[test]
    fn test_unparsable_xml_returns_none() {
        assert!(parse_forecast_xml("not xml at all <<<").is_none());
    }

    #[test]
    fn test_missing_identifier_returns_none() {
        let xml = r#"<product>
  <amoc><issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local></amoc>
  <forecast><area description="Sydney" type="location"/></forecast>
</product>"#;
        assert!(parse_forecast_xml(xml).is_none());
    }

    #[test]
    fn test_missing_issue_time_returns_none() {
        let xml = r#"<product>
  <amoc><identifier>IDN10064</identifier></amoc>
  <forecast><area description="Sydney" type="location"/></forecast>
</product>"#;
        assert!(parse_forecast_xml(xml).is_none());
    }

    #[test]
    fn test_missing_location_area_returns_none() {
        let xml = r#"<product>
  <amoc>
    <identifier>IDN10064</identifier>
    <issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local>
  </amoc>
  <forecast>
    <area description="New South Wales" type="region"/>
  </forecast>
</product>"#;
        assert!(parse_forecast_xml(xml).is_none());
    }

    #[test]
    fn test_period_with_bad_date_is_skipped() {
        let xml = r#"<product>
  <amoc>
    <identifier>IDN10064</identifier>
    <issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local>
  </amoc>
  <forecast>
    <area description="Sydney" type="location">
      <forecast-period start-time-local="not-a-date">
        <element type="forecast_icon_code">3</element>
      </forecast-period>
      <forecast-period start-time-local="2025-06-02T00:00:00+10:00">
        <element type="forecast_icon_code">16</element>
      </forecast-period>
    </area>
  </forecast>
</product>"#;
        let parsed = parse_forecast_xml(xml).unwrap();
        assert_eq!(parsed.forecasts.len(), 1);
        assert_eq!(parsed.forecasts[0].icon_code, Some(16));
    }

    #[test]
    fn test_malformed_integer_element_is_dropped() {
        let xml = r#"<product>
  <amoc>
    <identifier>IDN10064</identifier>
    <issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local>
  </amoc>
  <forecast>
    <area description="Sydney" type="location">
      <forecast-period start-time-local="2025-06-01T00:00:00+10:00">
        <element type="forecast_icon_code">cloudy</element>
        <element type="air_temperature_maximum" units="Celsius">24</element>
      </forecast-period>
    </area>
  </forecast>
</product>"#;
        let parsed = parse_forecast_xml(xml).unwrap();
        assert_eq!(parsed.forecasts[0].icon_code, None);
        assert_eq!(parsed.forecasts[0].temp_max, Some(24));
    }

    #[test]
    fn test_empty_location_area_excludes_later_sibling_periods() {
        // A self-closing location area has no periods of its own; periods in
        // a following region area must not be attributed to it.
        let xml = r#"<product>
  <amoc>
    <identifier>IDN10064</identifier>
    <issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local>
  </amoc>
  <forecast>
    <area description="Sydney" type="location"/>
    <area description="New South Wales" type="region">
      <forecast-period start-time-local="2025-06-01T00:00:00+10:00">
        <element type="forecast_icon_code">3</element>
      </forecast-period>
    </area>
  </forecast>
</product>"#;
        let parsed = parse_forecast_xml(xml).unwrap();
        assert_eq!(parsed.city_name, "Sydney");
        assert!(parsed.forecasts.is_empty());
    }

    #[test]
    fn test_self_closing_period_yields_entry_without_fields() {
        let xml = r#"<product>
  <amoc>
    <identifier>IDN10064</identifier>
    <issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local>
  </amoc>
  <forecast>
    <area description="Sydney" type="location">
      <forecast-period start-time-local="2025-06-03T00:00:00+10:00"/>
      <forecast-period start-time-local="2025-06-04T00:00:00+10:00">
        <element type="air_temperature_maximum" units="Celsius">21</element>
      </forecast-period>
    </area>
  </forecast>
</product>"#;
        let parsed = parse_forecast_xml(xml).unwrap();
        assert_eq!(parsed.forecasts.len(), 2);

        let empty_day = &parsed.forecasts[0];
        assert_eq!(
            empty_day.forecast_date,
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
        );
        assert_eq!(empty_day.icon_code, None);
        assert_eq!(empty_day.temp_max, None);
        assert_eq!(empty_day.precis, None);

        assert_eq!(parsed.forecasts[1].temp_max, Some(21));
    }

    #[test]
    fn test_no_periods_yields_empty_forecasts() {
        let xml = r#"<product>
  <amoc>
    <identifier>IDN10064</identifier>
    <issue-time-local tz="EST">2025-06-01T05:00:00+10:00</issue-time-local>
  </amoc>
  <forecast>
    <area description="Sydney" type="location"/>
  </forecast>
</product>"#;
        let parsed = parse_forecast_xml(xml).unwrap();
        assert!(parsed.forecasts.is_empty());
    }
}
