use serde::{Deserialize, Serialize};

/// Fixed persona the simulated patient plays for the whole session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    pub medical_history: String,
}

impl PatientProfile {
    pub fn new(name: &str, age: u32, medical_history: &str) -> Self {
        Self {
            name: name.to_string(),
            age,
            medical_history: medical_history.to_string(),
        }
    }

    /// The demo persona assigned to every new session
    pub fn demo() -> Self {
        Self::new("Alex", 35, "no known chronic diseases")
    }

    /// Render the profile block shared by every prompt template
    pub fn render(&self) -> String {
        format!(
            "Patient profile:\nName: {}\nAge: {}\nMedical history: {}",
            self.name, self.age, self.medical_history
        )
    }
}

impl Default for PatientProfile {
    fn default() -> Self {
        Self::demo()
    }
}
