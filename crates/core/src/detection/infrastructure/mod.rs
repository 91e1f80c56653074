pub mod json_file_detector;
