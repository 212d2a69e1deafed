//! Integration tests: whole publication runs against in-memory services.

mod mock_services;
mod pipeline_run;
