pub mod ports;
pub mod infer_use_case;
pub mod transform_use_case;
