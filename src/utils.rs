#[macro_export]
macro_rules! post_funcs {
    ( $( ( $func_name:ident, $url:tt, $request:ty, $response:ty ) ),+ $(,)? ) => {
        $(
            paste::paste! {
                #[post($url)]
                async fn $func_name(
                    state: web::Data<AppState>,
                    info: web::Json<$request>
                ) -> impl Responder {
                    let response = match [<$func_name _impl>](state, info).await {
                        Ok(response) => response,
                        Err(err) => {
                            let kind = err
                                .downcast_ref::<$crate::error::FlowError>()
                                .map(|e| e.kind());
                            match kind {
                                Some($crate::error::ErrorKind::Submission) | None => {
                                    tracing::warn!(endpoint = $url, "request failed: {:#}", err)
                                }
                                Some(_) => {
                                    tracing::debug!(endpoint = $url, "request rejected: {:#}", err)
                                }
                            }
                            <$response>::err(err.to_string())
                        }
                    };
                    HttpResponse::Ok().json(response)
                }
            }
        )+
    };
}

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

pub fn strip_non_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalizes `14:30`, `14:30:00`, `2:30pm` and `2:30 PM` to `2:30 PM`.
/// Strings that are not times are returned trimmed but otherwise untouched.
pub fn format_display_time(raw: &str) -> String {
    const FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

    let upper = raw.trim().to_ascii_uppercase();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&upper, fmt).ok())
        .map(|time| time.format("%-I:%M %p").to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_everything_but_digits() {
        assert_eq!(strip_non_digits("1234 5678-9012"), "123456789012");
        assert_eq!(strip_non_digits("a1b2"), "12");
        assert_eq!(strip_non_digits(""), "");
    }

    #[test]
    fn display_time_normalization() {
        assert_eq!(format_display_time("14:30"), "2:30 PM");
        assert_eq!(format_display_time("09:00"), "9:00 AM");
        assert_eq!(format_display_time("10:00 am"), "10:00 AM");
        assert_eq!(format_display_time("12:15:00"), "12:15 PM");
        assert_eq!(format_display_time(" morning "), "morning");
    }

    #[test]
    fn weekday_labels() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(weekday_label(date), "Fri");
    }
}
