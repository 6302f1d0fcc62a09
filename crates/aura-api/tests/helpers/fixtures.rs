//! Test fixtures: minimal image blobs and generated Word documents.

use aura_processing::docx::fixtures::DocxBuilder;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Minimal valid 1x1 PNG bytes.
pub fn create_minimal_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0x89, 0x00, 0x00, 0x00,
        0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// JPEG start/end markers around a few filler bytes; enough for a byte-for-byte round trip.
pub fn create_minimal_jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0xFF, 0xD9]
}

/// `report.docx`: a heading, some text, and two embedded images.
pub fn report_docx() -> Vec<u8> {
    DocxBuilder::new()
        .heading(1, "Quarterly Report")
        .paragraph("Revenue grew in every region.")
        .image("image1.png", &create_minimal_png())
        .paragraph("Regional breakdown:")
        .image("image2.jpeg", &create_minimal_jpeg())
        .bullet("North")
        .bullet("South")
        .build()
}

/// A document with a single embedded image.
pub fn single_image_docx() -> Vec<u8> {
    DocxBuilder::new()
        .paragraph("One picture follows.")
        .image("image1.png", &create_minimal_png())
        .build()
}

/// A document with text only.
pub fn text_only_docx() -> Vec<u8> {
    DocxBuilder::new()
        .heading(2, "Notes")
        .paragraph("Nothing embedded here.")
        .build()
}
