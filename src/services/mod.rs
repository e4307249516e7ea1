pub mod aggregator;
pub mod analytics;
pub mod autocomplete;
pub mod facets;
pub mod gateway;
pub mod query_builder;
pub mod rails;
pub mod range_facet;
pub mod suggestions;
