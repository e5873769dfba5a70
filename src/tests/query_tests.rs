#[cfg(test)]
mod query_tests {
    use crate::aggregate::{GroupKey, RankMetric};
    use crate::config::{RankScope, SpeciesKey};
    use crate::facets::{CategoryField, FacetId, FacetRegistry};
    use crate::filter::{apply, Predicate};
    use crate::query::{build_selection, ranking, QueryFilters};
    use crate::tests::test_helpers::test_helpers::{day, normalized, survey_records};

    fn species(name: &str) -> QueryFilters {
        QueryFilters {
            species: Some(name.to_string()),
            ..QueryFilters::default()
        }
    }

    #[test]
    fn test_no_filters_select_everything() {
        let dataset = normalized(&survey_records());
        let registry = FacetRegistry::from_dataset(&dataset);
        let selection = build_selection(&QueryFilters::default(), SpeciesKey::CommonName, &registry);
        assert!(selection.is_empty());
        assert_eq!(apply(&dataset, &selection).len(), dataset.len());
    }

    #[test]
    fn test_species_follows_common_name_key() {
        let dataset = normalized(&survey_records());
        let registry = FacetRegistry::from_dataset(&dataset);

        let selection = build_selection(&species("American Robin"), SpeciesKey::CommonName, &registry);
        assert_eq!(apply(&dataset, &selection).indices(), &[0, 2]);

        let selection = build_selection(
            &species("American Robin (Turdus migratorius)"),
            SpeciesKey::CommonName,
            &registry,
        );
        assert!(apply(&dataset, &selection).is_empty());
    }

    #[test]
    fn test_species_follows_full_name_key() {
        let dataset = normalized(&survey_records());
        let registry = FacetRegistry::from_dataset(&dataset);

        let selection = build_selection(
            &species(" American Robin (Turdus migratorius) "),
            SpeciesKey::FullName,
            &registry,
        );
        assert_eq!(selection.facets().collect::<Vec<_>>(), vec![FacetId::FullName]);
        assert_eq!(apply(&dataset, &selection).indices(), &[0]);

        // the robin without a scientific name keeps its bare common name
        let selection = build_selection(&species("American Robin"), SpeciesKey::FullName, &registry);
        assert_eq!(apply(&dataset, &selection).indices(), &[2]);
    }

    #[test]
    fn test_explicit_full_name_wins_over_species() {
        let dataset = normalized(&survey_records());
        let registry = FacetRegistry::from_dataset(&dataset);
        let filters = QueryFilters {
            species: Some("Blue Jay (Cyanocitta cristata)".into()),
            full_name: Some("Song Sparrow (Melospiza melodia)".into()),
            ..QueryFilters::default()
        };
        let selection = build_selection(&filters, SpeciesKey::FullName, &registry);
        assert_eq!(
            selection.get(FacetId::FullName),
            Some(&Predicate::Category {
                field: CategoryField::FullName,
                value: "Song Sparrow (Melospiza melodia)".into(),
            })
        );
    }

    #[test]
    fn test_open_bounds_are_filled() {
        let dataset = normalized(&survey_records());
        let registry = FacetRegistry::from_dataset(&dataset);
        let filters = QueryFilters {
            from: Some(day(2023, 5, 2)),
            temp_min: Some(15.0),
            ..QueryFilters::default()
        };
        let selection = build_selection(&filters, SpeciesKey::CommonName, &registry);

        assert_eq!(
            selection.get(FacetId::DateRange),
            Some(&Predicate::Dates {
                start: day(2023, 5, 2),
                end: day(2023, 7, 20),
            })
        );
        assert!(matches!(
            selection.get(FacetId::Temperature),
            Some(Predicate::Range { low, high, .. }) if *low == 15.0 && high.is_infinite()
        ));
        // row 4 has no temperature
        assert_eq!(apply(&dataset, &selection).indices(), &[5]);
    }

    #[test]
    fn test_ranking_scope() {
        let dataset = normalized(&survey_records());
        let registry = FacetRegistry::from_dataset(&dataset);
        let filters = QueryFilters {
            year: Some(2023),
            ..QueryFilters::default()
        };
        let view = apply(&dataset, &build_selection(&filters, SpeciesKey::CommonName, &registry));

        let pairs = |scope| {
            ranking(&dataset, &view, scope, GroupKey::CommonName, RankMetric::TotalCount, 10)
                .into_iter()
                .map(|e| (e.key, e.value))
                .collect::<Vec<_>>()
        };
        assert_eq!(
            pairs(RankScope::Dataset),
            vec![
                ("American Robin".to_string(), 7),
                ("Song Sparrow".to_string(), 6),
                ("Blue Jay".to_string(), 3),
            ]
        );
        assert_eq!(
            pairs(RankScope::Selection),
            vec![
                ("Song Sparrow".to_string(), 6),
                ("American Robin".to_string(), 3),
                ("Blue Jay".to_string(), 1),
            ]
        );
    }
}
