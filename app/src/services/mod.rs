pub mod print_queue;
pub mod printer;
pub mod printer_pipeline;
pub mod source;
