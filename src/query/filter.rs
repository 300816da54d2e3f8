use chrono::NaiveDate;

use super::PrefixQuery;
use crate::error::{AppError, AppResult};
use crate::models::{SearchQuery, SearchSort, TitleType};

/// One independently optional condition of a title filter
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Full-text prefix match against the title search vector
    Text(PrefixQuery),
    /// Release date on or before the given day; undated titles never match
    ReleasedOnOrBefore(NaiveDate),
    ReleasedOnOrAfter(NaiveDate),
    TypeIs(TitleType),
    RatingAtLeast(f64),
    RatingAtMost(f64),
    /// Title is associated with the genre
    HasGenre(i64),
}

/// Conjunction of predicates applied to the title catalog
#[derive(Debug, Clone, PartialEq)]
pub struct TitleFilter {
    predicates: Vec<Predicate>,
}

impl TitleFilter {
    /// Matches every title
    pub fn all() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Base filter shared by every catalog listing: nothing unreleased
    pub fn released_by(today: NaiveDate) -> Self {
        Self {
            predicates: vec![Predicate::ReleasedOnOrBefore(today)],
        }
    }

    /// Appends a predicate when present
    pub fn and(mut self, predicate: Option<Predicate>) -> Self {
        if let Some(predicate) = predicate {
            self.predicates.push(predicate);
        }
        self
    }

    /// Builds the faceted search filter.
    ///
    /// The text predicate is only added when the query yields at least one
    /// term, so a blank query degenerates to pure facet filtering.
    pub fn for_search(query: &SearchQuery, today: NaiveDate) -> AppResult<Self> {
        let year_from = query.year_from.map(year_start).transpose()?;
        let year_to = query.year_to.map(year_end).transpose()?;

        Ok(Self::released_by(today)
            .and(PrefixQuery::parse(query.text()).map(Predicate::Text))
            .and(query.title_type.map(Predicate::TypeIs))
            .and(year_from.map(Predicate::ReleasedOnOrAfter))
            .and(year_to.map(Predicate::ReleasedOnOrBefore))
            .and(query.min_rating.map(Predicate::RatingAtLeast))
            .and(query.max_rating.map(Predicate::RatingAtMost))
            .and(query.genre_id().map(Predicate::HasGenre)))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

fn year_start(year: i32) -> AppResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| AppError::InvalidInput(format!("Year {} is out of range", year)))
}

fn year_end(year: i32) -> AppResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| AppError::InvalidInput(format!("Year {} is out of range", year)))
}

/// ORDER BY clause for each sort mode, always ending in the id tie-break
pub fn order_by_clause(sort: SearchSort) -> &'static str {
    match sort {
        SearchSort::Popularity => "t.popularity DESC NULLS LAST, t.id ASC",
        SearchSort::Newest => "t.release_date DESC NULLS LAST, t.id ASC",
        SearchSort::Rating => "t.rating_weighted DESC NULLS LAST, t.id ASC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_all_has_no_predicates() {
        assert!(TitleFilter::all().predicates().is_empty());
        assert_eq!(
            TitleFilter::all().and(Some(Predicate::HasGenre(18))).predicates(),
            &[Predicate::HasGenre(18)]
        );
    }

    #[test]
    fn test_empty_query_only_filters_release_date() {
        let filter = TitleFilter::for_search(&SearchQuery::default(), today()).unwrap();
        assert_eq!(
            filter.predicates(),
            &[Predicate::ReleasedOnOrBefore(today())]
        );
    }

    #[test]
    fn test_punctuation_only_query_adds_no_text_predicate() {
        let query = SearchQuery {
            query: Some("?!".to_string()),
            ..Default::default()
        };
        let filter = TitleFilter::for_search(&query, today()).unwrap();
        assert_eq!(filter.predicates().len(), 1);
    }

    #[test]
    fn test_all_facets_become_predicates() {
        let query = SearchQuery {
            query: Some("alien".to_string()),
            title_type: Some(TitleType::Movie),
            year_from: Some(1979),
            year_to: Some(1986),
            genre_ids: Some(vec![878, 27]),
            min_rating: Some(7.0),
            max_rating: Some(9.5),
            ..Default::default()
        };

        let filter = TitleFilter::for_search(&query, today()).unwrap();
        assert_eq!(
            filter.predicates(),
            &[
                Predicate::ReleasedOnOrBefore(today()),
                Predicate::Text(PrefixQuery::parse("alien").unwrap()),
                Predicate::TypeIs(TitleType::Movie),
                Predicate::ReleasedOnOrAfter(NaiveDate::from_ymd_opt(1979, 1, 1).unwrap()),
                Predicate::ReleasedOnOrBefore(NaiveDate::from_ymd_opt(1986, 12, 31).unwrap()),
                Predicate::RatingAtLeast(7.0),
                Predicate::RatingAtMost(9.5),
                Predicate::HasGenre(878),
            ]
        );
    }

    #[test]
    fn test_unrepresentable_year_is_invalid_input() {
        let query = SearchQuery {
            year_from: Some(i32::MAX),
            ..Default::default()
        };
        assert!(matches!(
            TitleFilter::for_search(&query, today()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_every_sort_mode_breaks_ties_by_id() {
        for sort in [SearchSort::Popularity, SearchSort::Newest, SearchSort::Rating] {
            assert!(order_by_clause(sort).ends_with("t.id ASC"));
        }
        assert!(order_by_clause(SearchSort::Rating).starts_with("t.rating_weighted DESC"));
    }
}
