//! # Tour Aggregations
//!
//! Grouped statistics over the public tours: per-difficulty rating and price
//! figures, and a per-month plan of tour starts for a given year.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use nt_store::Document;
use serde::Serialize;
use serde_json::Value;

/// Tours rated at least this well are part of the statistics.
pub const STATS_MIN_RATING: f64 = 4.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    #[serde(rename = "_id")]
    pub difficulty: String,
    pub num_tours: usize,
    pub num_ratings: f64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPlan {
    pub month: u32,
    pub num_tour_starts: usize,
    pub tours: Vec<String>,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    ratings: f64,
    rating_sum: f64,
    price_sum: f64,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

/// Group by upper-cased difficulty, sorted by average price ascending.
pub fn tour_stats(tours: &[Document]) -> Vec<DifficultyStats> {
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();

    for tour in tours {
        let rating = number(tour, "ratingsAverage");
        if !rating.is_some_and(|r| r >= STATS_MIN_RATING) {
            continue;
        }

        let difficulty = tour
            .get("difficulty")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase();
        let acc = groups.entry(difficulty).or_default();
        acc.count += 1;
        acc.ratings += number(tour, "ratingsQuantity").unwrap_or(0.0);
        acc.rating_sum += rating.unwrap_or(0.0);

        if let Some(price) = number(tour, "price") {
            acc.price_sum += price;
            acc.min_price = Some(acc.min_price.map_or(price, |m| m.min(price)));
            acc.max_price = Some(acc.max_price.map_or(price, |m| m.max(price)));
        }
    }

    let mut stats: Vec<DifficultyStats> = groups
        .into_iter()
        .map(|(difficulty, acc)| {
            let n = acc.count as f64;
            DifficultyStats {
                difficulty,
                num_tours: acc.count,
                num_ratings: acc.ratings,
                avg_rating: acc.rating_sum / n,
                avg_price: acc.price_sum / n,
                min_price: acc.min_price.unwrap_or(0.0),
                max_price: acc.max_price.unwrap_or(0.0),
            }
        })
        .collect();

    stats.sort_by(|a, b| a.avg_price.total_cmp(&b.avg_price));
    stats
}

/// One entry per month of `year` with at least one tour start, busiest
/// month first.
pub fn monthly_plan(tours: &[Document], year: i32) -> Vec<MonthPlan> {
    let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for tour in tours {
        let name = tour
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let Some(Value::Array(dates)) = tour.get("startDates") else {
            continue;
        };

        for date in dates.iter().filter_map(Value::as_str).filter_map(parse_date) {
            if date.year() == year {
                months.entry(date.month()).or_default().push(name.clone());
            }
        }
    }

    let mut plan: Vec<MonthPlan> = months
        .into_iter()
        .map(|(month, tours)| MonthPlan {
            month,
            num_tour_starts: tours.len(),
            tours,
        })
        .collect();

    // Stable: equally busy months stay in calendar order
    plan.sort_by(|a, b| b.num_tour_starts.cmp(&a.num_tour_starts));
    plan
}

fn number(doc: &Document, field: &str) -> Option<f64> {
    doc.get(field).and_then(Value::as_f64)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc().date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d,%H:%M") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tours() -> Vec<Document> {
        [
            json!({ "name": "The Forest Hiker", "difficulty": "easy", "ratingsAverage": 4.7, "ratingsQuantity": 37, "price": 397,
                    "startDates": ["2021-04-25,10:00", "2021-07-20,10:00", "2021-10-05,10:00"] }),
            json!({ "name": "The Sea Explorer", "difficulty": "medium", "ratingsAverage": 4.8, "ratingsQuantity": 23, "price": 497,
                    "startDates": ["2021-06-19,10:00", "2021-07-20,10:00", "2021-08-18,10:00"] }),
            json!({ "name": "The Snow Adventurer", "difficulty": "difficult", "ratingsAverage": 4.5, "ratingsQuantity": 13, "price": 997,
                    "startDates": ["2022-01-05,10:00"] }),
            json!({ "name": "The City Wanderer", "difficulty": "easy", "ratingsAverage": 4.6, "ratingsQuantity": 54, "price": 1197,
                    "startDates": ["2021-03-11T09:00:00.000Z", "2021-05-02"] }),
            json!({ "name": "The Wine Taster", "difficulty": "easy", "ratingsAverage": 4.4, "ratingsQuantity": 73, "price": 1997 }),
        ]
        .into_iter()
        .map(|v| nt_store::document_from_value(v).unwrap())
        .collect()
    }

    #[test]
    fn test_stats_grouped_and_sorted_by_avg_price() {
        let stats = tour_stats(&tours());
        let ids: Vec<&str> = stats.iter().map(|s| s.difficulty.as_str()).collect();
        assert_eq!(ids, vec!["MEDIUM", "EASY", "DIFFICULT"]);

        let easy = &stats[1];
        assert_eq!(easy.num_tours, 2);
        assert_eq!(easy.num_ratings, 91.0);
        assert_eq!(easy.min_price, 397.0);
        assert_eq!(easy.max_price, 1197.0);
        assert_eq!(easy.avg_price, 797.0);
        assert!((easy.avg_rating - 4.65).abs() < 1e-9);
    }

    #[test]
    fn test_stats_serialize_with_group_id() {
        let stats = tour_stats(&tours());
        let v = serde_json::to_value(&stats[0]).unwrap();
        assert_eq!(v["_id"], json!("MEDIUM"));
        assert_eq!(v["numTours"], json!(1));
        assert!(v.get("avgPrice").is_some());
    }

    #[test]
    fn test_monthly_plan_for_year() {
        let plan = monthly_plan(&tours(), 2021);
        assert_eq!(plan[0].month, 7);
        assert_eq!(plan[0].num_tour_starts, 2);
        assert_eq!(plan[0].tours, vec!["The Forest Hiker", "The Sea Explorer"]);

        let months: Vec<u32> = plan.iter().map(|m| m.month).collect();
        assert_eq!(months, vec![7, 3, 4, 5, 6, 8, 10]);
    }

    #[test]
    fn test_monthly_plan_empty_year() {
        assert!(monthly_plan(&tours(), 1999).is_empty());
        assert_eq!(monthly_plan(&tours(), 2022).len(), 1);
    }
}
