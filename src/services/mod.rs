pub mod chart_service;
pub mod document_service;
pub mod factsheet_service;
pub mod fonts;
pub mod input_service;
pub mod pdf_fonts;
pub mod pdf_layout;
pub mod table_service;
pub mod template_service;
