// 📝 Submission - the values one form submit carries
// Lives for a single request; nothing is kept afterwards

use crate::staging::UploadedPhoto;

pub const MSG_INCOMPLETE: &str =
    "Veuillez remplir tous les champs et télécharger au moins une photo.";

#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub client_name: String,
    pub address: String,

    /// Decimal string, typed by the user or filled by geocoding
    pub latitude: String,

    /// Decimal string, typed by the user or filled by geocoding
    pub longitude: String,

    pub photos: Vec<UploadedPhoto>,
}

impl Submission {
    /// Every text field filled and at least one photo attached
    pub fn is_complete(&self) -> bool {
        [&self.client_name, &self.address, &self.latitude, &self.longitude]
            .iter()
            .all(|v| !v.trim().is_empty())
            && !self.photos.is_empty()
    }

    /// Text stored with the deposit
    pub fn description(&self) -> String {
        format!(
            "SCELLÉ NUMERIQUE Bénéficiaire: Nom: {}, Adresse: {}, Coordonnées GPS: Latitude {}, Longitude {}",
            self.client_name.trim(),
            self.address.trim(),
            self.latitude.trim(),
            self.longitude.trim()
        )
    }
}
