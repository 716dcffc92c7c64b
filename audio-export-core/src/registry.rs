use crate::models::error::ExportError;
use crate::traits::encoder_factory::EncoderFactory;

/// Ordered collection of export backends.
///
/// Backends are listed in registration order. Names must be unique, and a
/// backend whose traits are inconsistent is rejected at registration.
#[derive(Default)]
pub struct EncoderRegistry {
    factories: Vec<Box<dyn EncoderFactory>>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Box<dyn EncoderFactory>) -> Result<(), ExportError> {
        let traits = factory.traits();
        traits.validate()?;
        if self.find(&traits.encoder_name).is_some() {
            return Err(ExportError::MalformedBackend(format!(
                "duplicate backend name {}",
                traits.encoder_name
            )));
        }
        log::debug!(
            "Registered {} backend ({})",
            traits.encoder_name,
            if factory.is_available() { "available" } else { "unavailable" }
        );
        self.factories.push(factory);
        Ok(())
    }

    /// Looks a backend up by its display name.
    pub fn find(&self, name: &str) -> Option<&dyn EncoderFactory> {
        self.iter().find(|f| f.traits().encoder_name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn EncoderFactory> {
        self.factories.iter().map(|f| f.as_ref())
    }

    /// Backends whose runtime dependency is present.
    pub fn available(&self) -> impl Iterator<Item = &dyn EncoderFactory> {
        self.iter().filter(|f| f.is_available())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
