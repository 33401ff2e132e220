/// Unit tests for the pure streak calculator and the domain entities
mod domain_tests;
mod streak_tests;
