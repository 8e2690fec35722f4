//! Test data builders for records and fake clinic pages

use collector_core::AppointmentRecord;

use crate::mocks::FakePatientRow;

/// Builder for creating test AppointmentRecord values
pub struct AppointmentBuilder {
    record: AppointmentRecord,
}

impl Default for AppointmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentBuilder {
    pub fn new() -> Self {
        Self {
            record: AppointmentRecord {
                date: "01-01-2024".to_string(),
                department: "Main Clinic".to_string(),
                patient_name: "Test Patient".to_string(),
                patient_phone: "5550100".to_string(),
                start_time: "10:00".to_string(),
                end_time: "10:30".to_string(),
                doctor: "Dr. Test".to_string(),
                remark: "Checkup".to_string(),
                status: "Booked".to_string(),
            },
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.record.date = date.to_string();
        self
    }

    pub fn with_patient(mut self, name: &str, phone: &str) -> Self {
        self.record.patient_name = name.to_string();
        self.record.patient_phone = phone.to_string();
        self
    }

    pub fn with_time(mut self, start: &str, end: &str) -> Self {
        self.record.start_time = start.to_string();
        self.record.end_time = end.to_string();
        self
    }

    pub fn with_doctor(mut self, doctor: &str) -> Self {
        self.record.doctor = doctor.to_string();
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.record.status = status.to_string();
        self
    }

    pub fn with_remark(mut self, remark: &str) -> Self {
        self.record.remark = remark.to_string();
        self
    }

    pub fn build(self) -> AppointmentRecord {
        self.record
    }
}

/// Builder for rows of the fake patient table
pub struct PatientRowBuilder {
    row: FakePatientRow,
}

impl PatientRowBuilder {
    /// A complete nine-column row
    pub fn new(sr_no: u32, name: &str) -> Self {
        Self {
            row: FakePatientRow {
                cells: vec![
                    format!(" {sr_no} "),
                    format!("P-{sr_no:04}"),
                    format!(" {name} "),
                    "42".to_string(),
                    "F".to_string(),
                    "5550100".to_string(),
                    "General".to_string(),
                    "0.00".to_string(),
                    "01/01/2024".to_string(),
                ],
                link: None,
            },
        }
    }

    pub fn with_link(mut self, href: &str) -> Self {
        self.row.link = Some(href.to_string());
        self
    }

    pub fn with_cell(mut self, index: usize, text: &str) -> Self {
        if let Some(cell) = self.row.cells.get_mut(index) {
            *cell = text.to_string();
        }
        self
    }

    /// Drop trailing cells so the row has only `count` columns
    pub fn truncated(mut self, count: usize) -> Self {
        self.row.cells.truncate(count);
        self
    }

    pub fn build(self) -> FakePatientRow {
        self.row
    }
}
