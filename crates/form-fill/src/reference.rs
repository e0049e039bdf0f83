//! Reference sheet renderer
//!
//! A plain, Letter-sized summary of a test record for technicians to copy
//! into a city's online reporting portal. It is also the fallback whenever
//! the fillable report form cannot be used.

use crate::backflow::BackflowRecord;
use crate::schema::default_text_color;
use crate::Result;
use pdf_core::{Color, OverlayPage, PdfDocument, StandardFont, LETTER_HEIGHT, LETTER_WIDTH};

const MARGIN: f64 = 50.0;
const VALUE_X: f64 = 250.0;
const ROW_HEIGHT: f64 = 20.0;

/// A top-down writer that lays out labelled rows and starts a new page when
/// the cursor reaches the bottom margin
#[derive(Debug)]
pub struct ReferenceSheet {
    pages: Vec<OverlayPage>,
    y: f64,
}

impl Default for ReferenceSheet {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceSheet {
    pub fn new() -> Self {
        Self {
            pages: vec![OverlayPage::new(LETTER_WIDTH, LETTER_HEIGHT)],
            y: LETTER_HEIGHT - MARGIN,
        }
    }

    /// Current baseline, in points from the bottom of the page
    pub fn cursor(&self) -> f64 {
        self.y
    }

    /// Pages written so far, ignoring a trailing page with nothing on it
    pub fn page_count(&self) -> usize {
        match self.pages.last() {
            Some(last) if last.is_empty() && self.pages.len() > 1 => self.pages.len() - 1,
            _ => self.pages.len(),
        }
    }

    /// Content of a written page (0-based)
    pub fn page_content(&self, index: usize) -> Option<&[u8]> {
        self.pages.get(index).map(OverlayPage::content)
    }

    pub fn title(&mut self, text: &str) {
        self.text(text, StandardFont::HelveticaBold, 14.0, default_text_color());
        self.y -= 25.0;
    }

    pub fn subtitle(&mut self, text: &str) {
        self.text(text, StandardFont::Helvetica, 11.0, Color::black());
        self.y -= 30.0;
    }

    pub fn section(&mut self, heading: &str) {
        self.text(heading, StandardFont::HelveticaBold, 12.0, default_text_color());
        self.y -= ROW_HEIGHT;
    }

    /// A bold label with its value to the right; empty values read `N/A`
    pub fn field(&mut self, label: &str, value: &str) {
        let value = if value.is_empty() { "N/A" } else { value };
        let color = Color::black();
        let y = self.y;
        let page = self.current_page();
        page.draw_text(label, MARGIN, y, StandardFont::HelveticaBold, 10.0, color);
        page.draw_text(value, VALUE_X, y, StandardFont::Helvetica, 10.0, color);

        self.y -= ROW_HEIGHT;
        if self.y < MARGIN {
            self.pages.push(OverlayPage::new(LETTER_WIDTH, LETTER_HEIGHT));
            self.y = LETTER_HEIGHT - MARGIN;
        }
    }

    /// Extra space between sections
    pub fn gap(&mut self) {
        self.y -= 10.0;
    }

    /// Lay the written pages out as a new document
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.page_count();
        self.pages.truncate(count);

        let mut doc = PdfDocument::new();
        for overlay in &self.pages {
            let page = doc.add_blank_page(LETTER_WIDTH, LETTER_HEIGHT)?;
            doc.apply_overlay(page, overlay)?;
        }
        Ok(doc.to_bytes()?)
    }

    fn text(&mut self, text: &str, font: StandardFont, size: f32, color: Color) {
        let y = self.y;
        self.current_page().draw_text(text, MARGIN, y, font, size, color);
    }

    fn current_page(&mut self) -> &mut OverlayPage {
        let index = self.pages.len() - 1;
        &mut self.pages[index]
    }
}

/// Render the reference sheet for a test record
pub fn render_reference_sheet(record: &BackflowRecord) -> Result<Vec<u8>> {
    write_reference_sheet(record).finish()
}

fn write_reference_sheet(record: &BackflowRecord) -> ReferenceSheet {
    let device = &record.device;
    let test = &record.test;
    let city = &record.city_info;

    let mut sheet = ReferenceSheet::new();
    sheet.title("Online Form Reference Sheet");
    sheet.subtitle(&format!(
        "City: {} | Device: {}",
        record.city_code,
        device.serial_main.as_str()
    ));

    sheet.section("PUBLIC WATER SUPPLIER INFORMATION");
    let supplier = if city.pws_name.is_empty() {
        record.city_code.as_str()
    } else {
        city.pws_name.as_str()
    };
    sheet.field("Public Water Supplier:", supplier);
    sheet.field("PWS ID#:", city.pws_id.as_str());
    sheet.field("PWS Address:", city.pws_address.as_str());
    sheet.field("PWS Contact:", city.pws_contact.as_str());
    sheet.gap();

    sheet.section("DEVICE INFORMATION");
    sheet.field("Type:", device.type_main.as_str());
    sheet.field("Manufacturer:", device.manufacturer_main.as_str());
    sheet.field("Model:", device.model_main.as_str());
    sheet.field("Serial Number:", device.serial_main.as_str());
    sheet.field("Size:", device.size_main.as_str());
    sheet.gap();

    sheet.section("TEST INFORMATION");
    sheet.field("Test Date:", test.test_date_initial.as_str());
    sheet.field("Test Time:", test.test_time_initial.as_str());
    let result = if test.test_result.is_empty() {
        "Not Tested"
    } else {
        test.test_result.as_str()
    };
    sheet.field("Result:", result);

    let readings = [
        ("1st Check Reading:", &test.first_check_reading_initial),
        ("2nd Check Reading:", &test.second_check_reading_initial),
        ("Relief Valve Reading:", &test.relief_valve_reading_initial),
    ];
    for (label, reading) in readings {
        if !reading.is_empty() {
            sheet.field(label, &format!("{} PSI", reading.as_str()));
        }
    }

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    fn hex(font: StandardFont, text: &str) -> String {
        font.encode_text_hex(text)
    }

    #[test]
    fn test_title_layout() {
        let mut sheet = ReferenceSheet::new();
        assert_eq!(sheet.cursor(), 742.0);

        sheet.title("Online Form Reference Sheet");
        assert_eq!(sheet.cursor(), 717.0);
        sheet.subtitle("City: SPR | Device: AB123");
        assert_eq!(sheet.cursor(), 687.0);

        let content = sheet.page_content(0).unwrap();
        assert!(contains(content, "/HeBo 14 Tf"));
        assert!(contains(content, "50 742 Td"));
        assert!(contains(
            content,
            &hex(StandardFont::HelveticaBold, "Online Form Reference Sheet")
        ));
        assert!(contains(content, "50 717 Td"));
    }

    #[test]
    fn test_empty_value_reads_na() {
        let mut sheet = ReferenceSheet::new();
        sheet.field("PWS ID#:", "");

        let content = sheet.page_content(0).unwrap();
        assert!(contains(content, &hex(StandardFont::Helvetica, "N/A")));
        assert!(contains(content, "250 742 Td"));
        assert_eq!(sheet.cursor(), 722.0);
    }

    #[test]
    fn test_rows_break_onto_new_page() {
        let mut sheet = ReferenceSheet::new();
        for i in 0..35 {
            sheet.field("Row:", &i.to_string());
        }
        // 742 - 35 * 20 = 42 is below the margin, so page two is open but empty
        assert_eq!(sheet.cursor(), 742.0);
        assert_eq!(sheet.page_count(), 1);

        sheet.field("Row:", "35");
        assert_eq!(sheet.page_count(), 2);
        assert!(contains(
            sheet.page_content(1).unwrap(),
            &hex(StandardFont::Helvetica, "35")
        ));
    }

    #[test]
    fn test_readings_only_when_present() {
        let mut record = BackflowRecord::default();
        record.test.first_check_reading_initial = "5.2".into();

        let sheet = write_reference_sheet(&record);
        let content = sheet.page_content(0).unwrap();
        let bold = |text: &str| hex(StandardFont::HelveticaBold, text);
        assert!(contains(content, &bold("1st Check Reading:")));
        assert!(contains(content, &hex(StandardFont::Helvetica, "5.2 PSI")));
        assert!(!contains(content, &bold("2nd Check Reading:")));
        assert!(!contains(content, &bold("Relief Valve Reading:")));
        assert!(contains(content, &hex(StandardFont::Helvetica, "Not Tested")));

        let bytes = render_reference_sheet(&record).unwrap();
        let doc = PdfDocument::open_from_bytes(&bytes).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_size(1).unwrap().width, LETTER_WIDTH);
    }
}
