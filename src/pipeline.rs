//! One full pass over the current page: snapshot → groups → buckets → table.

use indexmap::IndexMap;
use tracing::info;

use crate::aggregator::{LabelAggregator, LabelBucket};
use crate::classifier::Classifier;
use crate::concurrent::AsyncClassifier;
use crate::config::PassConfig;
use crate::driver::PageDriver;
use crate::error::Result;
use crate::extractors::{extract_groups, MarkupQuery, TextGroup};
use crate::table::ResultTable;

/// Result of a completed pass.
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub table: ResultTable,
    pub buckets: IndexMap<String, LabelBucket>,
}

/// Accepted groups on the driver's current page.
pub fn snapshot_groups<D>(driver: &D, config: &PassConfig) -> Result<Vec<TextGroup>>
where
    D: PageDriver + ?Sized,
{
    let markup = driver.current_page_markup()?;
    let query = MarkupQuery::parse(&markup);
    let groups = extract_groups(&query, config)?;

    info!(
        url = driver.current_url().unwrap_or("<unknown>"),
        tag = %config.tag,
        attribute = %config.attribute,
        accepted = groups.len(),
        "extracted content blocks"
    );
    Ok(groups)
}

/// Classify the current page sequentially.
pub fn run_pass<D, C>(driver: &D, config: &PassConfig, classifier: &C) -> Result<PassOutput>
where
    D: PageDriver + ?Sized,
    C: Classifier + ?Sized,
{
    let mut aggregator = LabelAggregator::from_config(config)?;
    let groups = snapshot_groups(driver, config)?;
    let table = aggregator.run(groups, classifier)?;

    Ok(PassOutput {
        table,
        buckets: aggregator.into_buckets(),
    })
}

/// Classify the current page with up to `concurrency` calls in flight.
pub async fn run_pass_concurrent<D, C>(
    driver: &D,
    config: &PassConfig,
    classifier: &C,
    concurrency: usize,
) -> Result<PassOutput>
where
    D: PageDriver + ?Sized,
    C: AsyncClassifier,
{
    let mut aggregator = LabelAggregator::from_config(config)?;
    // The parsed document stays on this side of the await.
    let groups = snapshot_groups(driver, config)?;
    let table = aggregator
        .run_concurrent(groups, classifier, concurrency)
        .await?;

    Ok(PassOutput {
        table,
        buckets: aggregator.into_buckets(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::tests::StubClassifier;
    use crate::classifier::ScoredLabel;
    use crate::config::LabelSet;
    use crate::driver::StaticPage;
    use crate::error::Error;

    fn page() -> String {
        let mut html = String::from("<html><body>");
        for i in 0..8 {
            html.push_str(&format!("<div class=\"cost\">${}49</div>", i));
        }
        for i in 0..10 {
            html.push_str(&format!("<div class=\"alt-cost\">USD {}.00</div>", i));
        }
        for i in 0..8 {
            html.push_str(&format!("<div class=\"blurb\">Nice machine number {}</div>", i));
        }
        for _ in 0..9 {
            html.push_str("<div class=\"more\">Read more</div>");
        }
        html.push_str("</body></html>");
        html
    }

    fn config() -> PassConfig {
        PassConfig {
            labels: vec!["Price".into(), "Review".into()],
            ..PassConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_single_column() {
        let driver = StaticPage::new("file:///shop.html", page());
        let classifier = StubClassifier::default()
            .answer("$049", &[("Price", 0.9), ("Review", 0.1)])
            .answer("USD 0.00", &[("Review", 0.12), ("Price", 0.08)])
            .answer("Nice machine number 0", &[("Review", 0.15), ("Price", 0.05)]);

        let output = run_pass(&driver, &config(), &classifier).unwrap();

        assert_eq!(output.table.column_names().collect::<Vec<_>>(), vec!["Price"]);
        assert_eq!(output.table.row_count(), 8);
        assert_eq!(output.table.column("Price").unwrap()[7], "$749");
        // The repetitive "more" group never reached the classifier
        assert!(!classifier.calls.borrow().iter().any(|t| t == "Read more"));
    }

    #[test]
    fn test_end_to_end_collision() {
        let driver = StaticPage::new("file:///shop.html", page());
        let classifier = StubClassifier::default()
            .answer("$049", &[("Price", 0.9), ("Review", 0.1)])
            .answer("USD 0.00", &[("Price", 0.85), ("Review", 0.15)])
            .answer("Nice machine number 0", &[("Review", 0.15), ("Price", 0.05)]);

        let output = run_pass(&driver, &config(), &classifier).unwrap();

        assert_eq!(
            output.table.column_names().collect::<Vec<_>>(),
            vec!["Price", "Price-1"]
        );
        assert_eq!(output.table.row_count(), 10);
        assert_eq!(output.buckets["Price"].occupancy(), 2);
        assert_eq!(output.buckets["Price"].len(), 8);
        assert_eq!(output.table.column("Price").unwrap()[8], "");
    }

    #[test]
    fn test_configuration_errors_stop_before_classifying() {
        let driver = StaticPage::new("file:///shop.html", page());
        let classifier = StubClassifier::default();

        let no_labels = PassConfig::default();
        assert!(matches!(
            run_pass(&driver, &no_labels, &classifier),
            Err(Error::EmptyLabelSet)
        ));
        assert!(classifier.calls.borrow().is_empty());

        let empty = StaticPage::default();
        assert!(matches!(
            run_pass(&empty, &config(), &classifier),
            Err(Error::NoPage)
        ));
    }

    struct Fixed(Vec<ScoredLabel>);

    impl AsyncClassifier for Fixed {
        async fn classify(&self, _text: &str, _labels: &LabelSet) -> Result<Vec<ScoredLabel>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_concurrent_pass_matches_sequential() {
        let driver = StaticPage::new("file:///shop.html", page());
        let classifier = Fixed(vec![ScoredLabel::new("Price", 0.5), ScoredLabel::new("Review", 0.1)]);

        let output = run_pass_concurrent(&driver, &config(), &classifier, 4)
            .await
            .unwrap();

        assert_eq!(
            output.table.column_names().collect::<Vec<_>>(),
            vec!["Price", "Price-1", "Price-2"]
        );
        assert_eq!(output.buckets["Price-1"].source_key, "alt-cost");
        assert_eq!(output.buckets["Price"].occupancy(), 3);
    }
}
