pub mod pipeline_worker;
