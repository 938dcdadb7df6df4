use common::config::DatasetConfig;
use common::{Error, Result};
use std::fmt;
use std::ops::RangeInclusive;

/// One monthly trip-record file: `{category}_tripdata_{year}-{month:02}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub category: String,
    pub year: i32,
    pub month: u32,
}

impl WorkItem {
    pub fn new(category: &str, year: i32, month: u32) -> Self {
        Self {
            category: category.to_string(),
            year,
            month,
        }
    }

    pub fn stem(&self) -> String {
        format!(
            "{}_tripdata_{}-{:02}",
            self.category, self.year, self.month
        )
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}.csv", self.stem())
    }

    pub fn gz_file_name(&self) -> String {
        format!("{}.csv.gz", self.stem())
    }

    /// Object name in the bucket, the same as the staged csv file name.
    pub fn object_name(&self) -> String {
        self.csv_file_name()
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{:02}", self.category, self.year, self.month)
    }
}

/// The finite category × year × month enumeration of a run.
///
/// `items()` can be called any number of times and yields the same lazy
/// sequence: categories outermost, then years, then months.
#[derive(Debug, Clone)]
pub struct WorkPlan {
    categories: Vec<String>,
    years: Vec<i32>,
    months: RangeInclusive<u32>,
}

impl WorkPlan {
    pub fn new(categories: Vec<String>, years: Vec<i32>, months: RangeInclusive<u32>) -> Result<Self> {
        if categories.is_empty() {
            return Err(Error::InvalidInput("work plan needs at least one category".into()));
        }
        if years.is_empty() {
            return Err(Error::InvalidInput("work plan needs at least one year".into()));
        }
        if months.is_empty() || *months.start() < 1 || *months.end() > 12 {
            return Err(Error::InvalidInput(format!(
                "month range {}..={} is outside 1..=12",
                months.start(),
                months.end()
            )));
        }

        Ok(Self {
            categories,
            years,
            months,
        })
    }

    pub fn from_config(dataset: &DatasetConfig) -> Result<Self> {
        Self::new(
            dataset.categories.clone(),
            dataset.years.clone(),
            dataset.first_month..=dataset.last_month,
        )
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn months(&self) -> RangeInclusive<u32> {
        self.months.clone()
    }

    pub fn len(&self) -> usize {
        self.categories.len() * self.years.len() * self.months.clone().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> impl Iterator<Item = WorkItem> + '_ {
        self.categories.iter().flat_map(move |category| {
            self.years.iter().flat_map(move |&year| {
                self.months()
                    .map(move |month| WorkItem::new(category, year, month))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxi_plan() -> WorkPlan {
        WorkPlan::new(
            vec!["green".to_string(), "yellow".to_string()],
            vec![2019, 2020],
            1..=12,
        )
        .unwrap()
    }

    #[test]
    fn test_file_names() {
        let item = WorkItem::new("green", 2019, 3);
        assert_eq!(item.stem(), "green_tripdata_2019-03");
        assert_eq!(item.gz_file_name(), "green_tripdata_2019-03.csv.gz");
        assert_eq!(item.csv_file_name(), "green_tripdata_2019-03.csv");
        assert_eq!(item.object_name(), item.csv_file_name());
        assert_eq!(item.to_string(), "green 2019-03");

        let item = WorkItem::new("fhv", 2019, 11);
        assert_eq!(item.csv_file_name(), "fhv_tripdata_2019-11.csv");
    }

    #[test]
    fn test_taxi_plan_has_48_items() {
        let plan = taxi_plan();
        assert_eq!(plan.len(), 48);
        assert_eq!(plan.items().count(), 48);
    }

    #[test]
    fn test_plan_order() {
        let plan = taxi_plan();
        let items: Vec<WorkItem> = plan.items().collect();

        assert_eq!(items[0], WorkItem::new("green", 2019, 1));
        assert_eq!(items[11], WorkItem::new("green", 2019, 12));
        assert_eq!(items[12], WorkItem::new("green", 2020, 1));
        assert_eq!(items[24], WorkItem::new("yellow", 2019, 1));
        assert_eq!(items[47], WorkItem::new("yellow", 2020, 12));
    }

    #[test]
    fn test_plan_is_restartable() {
        let plan = taxi_plan();
        let first: Vec<WorkItem> = plan.items().collect();
        let second: Vec<WorkItem> = plan.items().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_plan_is_lazy() {
        let plan = taxi_plan();
        let mut items = plan.items();
        assert_eq!(items.next(), Some(WorkItem::new("green", 2019, 1)));
        assert_eq!(items.next(), Some(WorkItem::new("green", 2019, 2)));
    }

    #[test]
    fn test_invalid_plans() {
        assert!(WorkPlan::new(vec![], vec![2019], 1..=12).is_err());
        assert!(WorkPlan::new(vec!["fhv".into()], vec![], 1..=12).is_err());
        assert!(WorkPlan::new(vec!["fhv".into()], vec![2019], 0..=12).is_err());
        assert!(WorkPlan::new(vec!["fhv".into()], vec![2019], 1..=13).is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 6..=5;
        assert!(WorkPlan::new(vec!["fhv".into()], vec![2019], reversed).is_err());
    }

    #[test]
    fn test_fhv_partial_year() {
        let plan = WorkPlan::new(vec!["fhv".into()], vec![2019], 4..=6).unwrap();
        let months: Vec<u32> = plan.items().map(|item| item.month).collect();
        assert_eq!(months, vec![4, 5, 6]);
    }
}
