//! Integration tests for both pipelines
//!
//! Garmin Connect, InfluxDB and the inference endpoint are all mocked with
//! wiremock.

use chrono::NaiveDate;
use garmin_relay::client::{FitnessSource, GarminClient, GarminSource, OAuth2Token};
use garmin_relay::config::{InferenceConfig, InfluxConfig};
use garmin_relay::health::{flatten, DailyHealthRecord, HealthField, MetricValue};
use garmin_relay::pipeline::{Collector, DateStatus, Reporter};
use garmin_relay::report::{pivot, DispatchOutcome, InferenceClient};
use garmin_relay::store::{InfluxStore, MemoryStore, SeriesStore, TimeRange};
use garmin_relay::RelayError;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_token() -> OAuth2Token {
    OAuth2Token::from_access_token("test-access-token")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn influx_config(server: &MockServer) -> InfluxConfig {
    InfluxConfig {
        url: server.uri(),
        token: "influx-token".to_string(),
        org: "home".to_string(),
        bucket: "garmin".to_string(),
        measurement: "health_data".to_string(),
    }
}

fn inference_config(server: &MockServer) -> InferenceConfig {
    InferenceConfig {
        url: format!("{}/v1/completions", server.uri()),
        ..InferenceConfig::default()
    }
}

fn report_range() -> TimeRange {
    TimeRange::trailing_days(7, day(5).and_hms_opt(23, 59, 59).unwrap().and_utc())
}

async fn mount_garmin_day(server: &MockServer, date: &str) {
    Mock::given(method("GET"))
        .and(path("/wellness-service/wellness/dailySummaryChart/runner42"))
        .and(query_param("date", date))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"startGMT": "2024-01-01T00:00:00.0", "steps": 12000},
            {"startGMT": "2024-01-01T00:15:00.0", "steps": 8000}
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wellness-service/wellness/dailyHeartRate/runner42"))
        .and(query_param("date", date))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "maxHeartRate": 175,
            "restingHeartRate": 65,
            "lastSevenDaysAvgRestingHeartRate": 68
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wellness-service/wellness/dailySleepData/runner42"))
        .and(query_param("date", date))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dailySleepDTO": {
                "sleepTimeSeconds": 28800,
                "sleepStartTimestampGMT": 1672324800,
                "sleepEndTimestampGMT": 1672353600,
                "deepSleepSeconds": 7200,
                "lightSleepSeconds": 14400,
                "remSleepSeconds": 5400,
                "awakeSleepSeconds": 1800,
                "averageRespirationValue": 14.0,
                "lowestRespirationValue": 10.0,
                "highestRespirationValue": 18.0,
                "avgSleepStress": 2.5
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/wellness-service/wellness/dailyStress/{}", date)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "maxStressLevel": 90,
            "avgStressLevel": 35
        })))
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/userprofile-service/socialProfile"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "displayName": "runner42",
            "fullName": "Test Runner"
        })))
        .expect(1)
        .mount(server)
        .await;
}

mod collector_tests {
    use super::*;

    #[tokio::test]
    async fn test_collects_full_day_from_garmin() {
        let garmin = MockServer::start().await;
        mount_profile(&garmin).await;
        mount_garmin_day(&garmin, "2024-01-05").await;

        let client = GarminClient::new_with_base_url(&garmin.uri()).unwrap();
        let source = GarminSource::new(client, test_token());
        let store = MemoryStore::new();

        let report = Collector::new(&source, &store, "health_data")
            .run(day(5), 1)
            .await
            .unwrap();

        assert_eq!(report.written(), 1);
        assert_eq!(report.outcomes[0].status, DateStatus::Written { fields: 17 });

        let record = report.outcomes[0].record.as_ref().unwrap();
        assert_eq!(record.total_steps, Some(20000));
        assert_eq!(record.heart_rate_resting, Some(65));
        assert_eq!(record.sleep.average_sleep_stress, Some(2.5));
        assert_eq!(record.stress.max_stress_level, Some(90));
    }

    #[tokio::test]
    async fn test_missing_upstream_dates_are_isolated() {
        let garmin = MockServer::start().await;
        mount_profile(&garmin).await;
        mount_garmin_day(&garmin, "2024-01-05").await;
        // Nothing mounted for 2024-01-04: every category 404s

        let client = GarminClient::new_with_base_url(&garmin.uri()).unwrap();
        let source = GarminSource::new(client, test_token());
        let store = MemoryStore::new();

        let report = Collector::new(&source, &store, "health_data")
            .run(day(5), 2)
            .await
            .unwrap();

        assert_eq!(report.outcomes[0].date, day(5));
        assert_eq!(report.written(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_token_aborts_collection() {
        let garmin = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userprofile-service/socialProfile"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&garmin)
            .await;

        let client = GarminClient::new_with_base_url(&garmin.uri()).unwrap();
        let source = GarminSource::new(client, test_token());
        let store = MemoryStore::new();

        let err = Collector::new(&source, &store, "health_data")
            .run(day(5), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::NotAuthenticated));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_stress_endpoint_does_not_need_display_name() {
        let garmin = MockServer::start().await;
        mount_garmin_day(&garmin, "2024-01-05").await;

        let client = GarminClient::new_with_base_url(&garmin.uri()).unwrap();
        let source = GarminSource::new(client, test_token());

        let stress = source.stress(day(5)).await.unwrap();
        assert_eq!(stress["avgStressLevel"], 35);
    }
}

mod influx_tests {
    use super::*;

    #[tokio::test]
    async fn test_write_sends_line_protocol() {
        let influx = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/write"))
            .and(query_param("org", "home"))
            .and(query_param("bucket", "garmin"))
            .and(query_param("precision", "s"))
            .and(header("Authorization", "Token influx-token"))
            .and(body_string_contains("health_data,date=2024-01-05 "))
            .and(body_string_contains("total_steps=20000i"))
            .and(body_string_contains("average_sleep_stress=2.5"))
            .and(body_string_contains(" 1704412800"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&influx)
            .await;

        let store = InfluxStore::new(&influx_config(&influx)).unwrap();
        let mut record = DailyHealthRecord::empty(day(5));
        record.total_steps = Some(20000);
        record.sleep.average_sleep_stress = Some(2.5);

        store.write("health_data", &flatten(&record)).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_influx_message() {
        let influx = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/write"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": "unauthorized",
                "message": "unauthorized access"
            })))
            .mount(&influx)
            .await;

        let store = InfluxStore::new(&influx_config(&influx)).unwrap();
        let mut record = DailyHealthRecord::empty(day(5));
        record.total_steps = Some(1);

        let err = store.write("health_data", &flatten(&record)).await.unwrap_err();
        match err {
            RelayError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "unauthorized access");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_parses_annotated_csv() {
        let influx = MockServer::start().await;
        let body = "\
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,long,string,string,string\r
,result,table,_start,_stop,_time,_value,_field,_measurement,date\r
,_result,0,2023-12-30T00:00:00Z,2024-01-06T00:00:00Z,2024-01-05T00:00:00Z,20000,total_steps,health_data,2024-01-05\r
\r
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,double,string,string,string\r
,result,table,_start,_stop,_time,_value,_field,_measurement,date\r
,_result,1,2023-12-30T00:00:00Z,2024-01-06T00:00:00Z,2024-01-05T00:00:00Z,14,average_respiration,health_data,2024-01-05\r
\r
";
        Mock::given(method("POST"))
            .and(path("/api/v2/query"))
            .and(query_param("org", "home"))
            .and(header("Authorization", "Token influx-token"))
            .and(body_string_contains("from(bucket: \\\"garmin\\\")"))
            .and(body_string_contains("total_steps"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&influx)
            .await;

        let store = InfluxStore::new(&influx_config(&influx)).unwrap();
        let fields = HealthField::known_names();
        let points = store
            .query("health_data", &report_range(), &fields)
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, MetricValue::Int(20000));
        assert_eq!(points[1].field, "average_respiration");
        assert_eq!(points[1].value, MetricValue::Float(14.0));
    }
}

mod reporter_tests {
    use super::*;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for d in [3, 4, 5] {
            let mut record = DailyHealthRecord::empty(day(d));
            record.total_steps = Some(i64::from(d) * 1000);
            record.heart_rate_max = Some(170);
            store.write("health_data", &flatten(&record)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_dispatch_failure_still_reports_prompts() {
        let lm = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .expect(1)
            .mount(&lm)
            .await;

        let store = seeded_store().await;
        let fields = HealthField::known_names();
        let client = InferenceClient::new(&inference_config(&lm)).unwrap();

        let summary = Reporter::new(&store, "health_data", &fields)
            .run(&report_range(), Some(&client))
            .await
            .unwrap();

        assert_eq!(summary.prompts.len(), 3);
        assert!(!summary.is_success());
        assert_eq!(
            summary.dispatch,
            Some(DispatchOutcome::Rejected {
                status: 500,
                body: "model not loaded".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_all_prompts_go_out_in_one_request() {
        let lm = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .and(body_string_contains("Please evaluate my health data for 2024-01-03T00:00:00Z"))
            .and(body_string_contains("Please evaluate my health data for 2024-01-05T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"index": 0, "text": "Walk more."},
                    {"index": 1, "text": "Keep it up."},
                    {"index": 2, "text": "Rest."}
                ]
            })))
            .expect(1)
            .mount(&lm)
            .await;

        let store = seeded_store().await;
        let fields = HealthField::known_names();
        let client = InferenceClient::new(&inference_config(&lm)).unwrap();

        let summary = Reporter::new(&store, "health_data", &fields)
            .run(&report_range(), Some(&client))
            .await
            .unwrap();

        assert!(summary.is_success());
        let outcome = summary.dispatch.unwrap();
        assert_eq!(outcome.completions(), vec!["Walk more.", "Keep it up.", "Rest."]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_outcome_not_an_error() {
        let store = seeded_store().await;
        let fields = HealthField::known_names();
        let client = InferenceClient::new(&InferenceConfig {
            url: "http://127.0.0.1:9/v1/completions".to_string(),
            timeout_secs: 2,
            ..InferenceConfig::default()
        })
        .unwrap();

        let summary = Reporter::new(&store, "health_data", &fields)
            .run(&report_range(), Some(&client))
            .await
            .unwrap();

        assert!(matches!(summary.dispatch, Some(DispatchOutcome::Unreachable { .. })));
        assert_eq!(summary.prompts.len(), 3);
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error() {
        let influx = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/query"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&influx)
            .await;

        let store = InfluxStore::new(&influx_config(&influx)).unwrap();
        let fields = HealthField::known_names();

        let result = Reporter::new(&store, "health_data", &fields)
            .run(&report_range(), None)
            .await;

        assert!(matches!(result, Err(RelayError::Api { status: 503, .. })));
    }
}

mod round_trip_tests {
    use super::*;
    use std::collections::BTreeMap;

    /// A record with every metric set, values distinct per `seed`
    fn full_record(date: NaiveDate, seed: i64) -> DailyHealthRecord {
        let mut record = DailyHealthRecord::empty(date);
        record.total_steps = Some(10_000 + seed);
        record.heart_rate_max = Some(160 + seed);
        record.heart_rate_resting = Some(50 + seed);
        record.seven_day_avg_resting = Some(52 + seed);
        record.sleep.sleep_time_seconds = Some(27_000 + seed);
        record.sleep.sleep_start_timestamp_gmt = Some(1_704_000_000_000 + seed);
        record.sleep.sleep_end_timestamp_gmt = Some(1_704_028_800_000 + seed);
        record.sleep.deep_sleep_seconds = Some(6_000 + seed);
        record.sleep.light_sleep_seconds = Some(14_000 + seed);
        record.sleep.rem_sleep_seconds = Some(5_000 + seed);
        record.sleep.awake_sleep_seconds = Some(900 + seed);
        record.sleep.average_respiration = Some(14.25 + seed as f64);
        record.sleep.lowest_respiration = Some(9.0 + seed as f64);
        record.sleep.highest_respiration = Some(19.5 + seed as f64);
        record.sleep.average_sleep_stress = Some(1.75 + seed as f64);
        record.stress.max_stress_level = Some(80 + seed);
        record.stress.average_stress_level = Some(30 + seed);
        record
    }

    /// Seed 0 keeps everything; later seeds drop a different mix of fields
    fn varied_record(date: NaiveDate, seed: i64) -> DailyHealthRecord {
        let mut record = full_record(date, seed);
        if seed % 2 == 1 {
            record.sleep = Default::default();
        }
        if seed % 3 == 2 {
            record.heart_rate_max = None;
            record.stress.average_stress_level = None;
            record.sleep.lowest_respiration = None;
        }
        if seed == 5 {
            record.total_steps = Some(0);
        }
        record
    }

    fn expected_fields(record: &DailyHealthRecord) -> BTreeMap<String, MetricValue> {
        record
            .present_fields()
            .map(|(field, value)| (field.name().to_string(), value))
            .collect()
    }

    #[tokio::test]
    async fn test_written_records_pivot_back_to_their_fields() {
        for n in 1..=7i64 {
            let store = MemoryStore::new();
            let records: Vec<DailyHealthRecord> = (0..n)
                .map(|seed| varied_record(day(5) - chrono::Duration::days(seed), seed))
                .collect();
            for record in &records {
                store.write("health_data", &flatten(record)).await.unwrap();
            }

            let fields = HealthField::known_names();
            let points = store
                .query("health_data", &report_range(), &fields)
                .await
                .unwrap();
            let pivot = pivot(points, &fields);

            assert_eq!(pivot.groups.len(), n as usize, "n = {n}");
            for record in &records {
                let timestamp = format!("{}T00:00:00Z", record.date);
                let group = pivot
                    .groups
                    .iter()
                    .find(|g| g.timestamp == timestamp)
                    .unwrap_or_else(|| panic!("no group for {timestamp}"));
                assert_eq!(group.fields, expected_fields(record), "date = {}", record.date);
            }
        }

        assert_eq!(expected_fields(&full_record(day(1), 0)).len(), HealthField::ALL.len());
    }
}
