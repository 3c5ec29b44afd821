pub mod ndjson_source;
pub mod ndjson_writer;
pub mod match_output_adapter;
pub mod graph_writer_adapter;
