#[cfg(test)]
mod report_tests {
    use approx::assert_relative_eq;

    use crate::aggregate::{GroupKey, RankEntry, RankMetric};
    use crate::data_models::Column;
    use crate::normalizer::{normalize, NormalizeOptions};
    use crate::report::{
        missing_value_counts, monthly_trend, occurrence_ranking, species_richness_by_site,
        top_observers, weather_correlation, DatasetReport, SiteRichness,
    };
    use crate::tests::test_helpers::test_helpers::{normalized, raw_row, scenario_dataset, survey_records};

    #[test]
    fn test_missing_value_counts() {
        let dataset = normalized(&survey_records());
        let missing = missing_value_counts(&dataset);

        assert_eq!(missing.len(), 12);
        assert_eq!(missing[&Column::Date], 0);
        assert_eq!(missing[&Column::StartTime], 1);
        assert_eq!(missing[&Column::EndTime], 2);
        assert_eq!(missing[&Column::ScientificName], 1);
        assert_eq!(missing[&Column::InitialThreeMinCnt], 1);
        assert_eq!(missing[&Column::Temperature], 1);
        assert_eq!(missing[&Column::Humidity], 1);
        assert_eq!(missing[&Column::Observer], 1);
        assert_eq!(missing[&Column::SiteName], 0);
    }

    #[test]
    fn test_missing_values_cover_only_present_columns() {
        let missing = missing_value_counts(&scenario_dataset());
        assert_eq!(
            missing.keys().copied().collect::<Vec<_>>(),
            vec![Column::Date, Column::CommonName, Column::InitialThreeMinCnt]
        );
    }

    #[test]
    fn test_occurrence_ranking_counts_rows() {
        let dataset = normalized(&survey_records());
        let ranking = occurrence_ranking(&dataset, GroupKey::CommonName, 10);
        // three-way tie, so alphabetical
        assert_eq!(
            ranking,
            vec![
                RankEntry { key: "American Robin".into(), value: 2 },
                RankEntry { key: "Blue Jay".into(), value: 2 },
                RankEntry { key: "Song Sparrow".into(), value: 2 },
            ]
        );
    }

    #[test]
    fn test_species_richness_by_site() {
        let dataset = normalized(&survey_records());
        assert_eq!(
            species_richness_by_site(&dataset),
            Some(vec![
                SiteRichness { site_name: "Creek Bend".into(), species: 2 },
                SiteRichness { site_name: "North Ridge".into(), species: 2 },
            ])
        );
        assert_eq!(species_richness_by_site(&scenario_dataset()), None);
    }

    #[test]
    fn test_top_observers_by_count() {
        let dataset = normalized(&survey_records());
        let observers = top_observers(&dataset, 10).unwrap();
        let pairs: Vec<(&str, u64)> = observers.iter().map(|e| (e.key.as_str(), e.value)).collect();
        assert_eq!(pairs, vec![("A. Lee", 6), ("C. Kim", 6), ("B. Ortiz", 3)]);
        assert!(top_observers(&scenario_dataset(), 10).is_none());
    }

    #[test]
    fn test_monthly_trend_is_zero_filled() {
        let dataset = normalized(&survey_records());
        let trend = monthly_trend(&dataset);

        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].year, 2022);
        assert_eq!(trend[0].months, [0, 0, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0]);
        assert_eq!(trend[1].year, 2023);
        assert_eq!(trend[1].months, [0, 0, 0, 0, 4, 0, 6, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_weather_correlation() {
        let dataset = normalized(&survey_records());
        let matrix = weather_correlation(&dataset).unwrap();

        assert_eq!(matrix.samples, 4);
        for i in 0..3 {
            assert_relative_eq!(matrix.values[i][i].unwrap(), 1.0, epsilon = 1e-12);
            for j in 0..3 {
                assert_eq!(matrix.values[i][j], matrix.values[j][i]);
            }
        }
        // temperature falls as humidity rises in this extract
        let temp_humidity = matrix.values[0][1].unwrap();
        assert!(temp_humidity < -0.9);
        assert_relative_eq!(temp_humidity, -0.975075, epsilon = 1e-5);
        assert_relative_eq!(matrix.values[0][2].unwrap(), 0.702513, epsilon = 1e-5);
    }

    #[test]
    fn test_weather_correlation_degenerate_cases() {
        assert!(weather_correlation(&scenario_dataset()).is_none());

        let records = [
            raw_row("2023-05-01", "Robin", "1")
                .with("Temperature", "10")
                .with("Humidity", "50"),
            raw_row("2023-05-02", "Robin", "2")
                .with("Temperature", "10")
                .with("Humidity", "60"),
        ];
        let matrix = weather_correlation(&normalized(&records)).unwrap();
        assert_eq!(matrix.samples, 2);
        // constant temperature has no defined correlation
        assert_eq!(matrix.values[0][1], None);
        assert_relative_eq!(matrix.values[1][2].unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dataset_report_bundle() {
        let outcome = normalize(&survey_records(), &NormalizeOptions::default()).unwrap();
        let report = DatasetReport::build(&outcome, GroupKey::CommonName, RankMetric::Occurrences, 2);

        assert_eq!(report.rows, 6);
        assert_eq!(report.columns, 12);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.summary.total, 16);
        assert_eq!(report.top_species.len(), 2);
        assert!(report.species_richness.is_some());
        assert_eq!(report.top_observers.as_ref().map(Vec::len), Some(2));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["missing_values"]["end_time"], 2);
        assert_eq!(json["summary"]["count"], 6);
        assert_eq!(json["species_metric"], "occurrences");
    }

    #[test]
    fn test_dataset_report_species_metric() {
        let outcome = normalize(&survey_records(), &NormalizeOptions::default()).unwrap();

        let by_rows = DatasetReport::build(&outcome, GroupKey::CommonName, RankMetric::Occurrences, 2);
        let keys: Vec<&str> = by_rows.top_species.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["American Robin", "Blue Jay"]);

        let by_count = DatasetReport::build(&outcome, GroupKey::CommonName, RankMetric::TotalCount, 2);
        assert_eq!(
            by_count.top_species,
            vec![
                RankEntry { key: "American Robin".into(), value: 7 },
                RankEntry { key: "Song Sparrow".into(), value: 6 },
            ]
        );
        assert_eq!(by_count.species_metric, RankMetric::TotalCount);
    }
}
