
mod query_tests;
mod report_tests;
