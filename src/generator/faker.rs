//! `fake`-backed generator
//!
//! Maps generator names to `fake` fakers in the configured locale. The RNG is
//! seedable so replay-stable runs are possible for generated rules.

use super::{Generator, Locale};
use crate::domain::{Result, SqlValue, VeilError};
use fake::faker::address::raw::{
    BuildingNumber, CityName, CountryName, PostCode, StateName, StreetName, ZipCode,
};
use fake::faker::company::raw::{Buzzword, CompanyName};
use fake::faker::creditcard::raw::CreditCardNumber;
use fake::faker::internet::raw::{
    DomainSuffix, FreeEmail, IPv4, Password, SafeEmail, Username,
};
use fake::faker::lorem::raw::{Paragraph, Sentence, Word};
use fake::faker::name::raw::{FirstName, LastName, Name};
use fake::faker::phone_number::raw::{CellNumber, PhoneNumber};
use fake::locales::{DE_DE, EN, FR_FR, JA_JP, PT_BR, ZH_CN};
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Attempts made by [`Generator::generate_unique`] before giving up
const MAX_UNIQUE_ATTEMPTS: usize = 10_000;

/// Names understood by [`FakeGenerator`]
pub const GENERATOR_NAMES: &[&str] = &[
    "email",
    "safe_email",
    "free_email",
    "username",
    "password",
    "ipv4",
    "domain_suffix",
    "first_name",
    "last_name",
    "name",
    "phone_number",
    "cell_number",
    "street_name",
    "building_number",
    "city",
    "zip_code",
    "post_code",
    "state",
    "country",
    "company",
    "buzzword",
    "word",
    "sentence",
    "paragraph",
    "credit_card",
    "uuid",
    "number",
];

macro_rules! localized {
    ($locale:expr, $rng:expr, |$l:ident| $faker:expr) => {
        match $locale {
            Locale::EnUs => {
                let $l = EN;
                $faker.fake_with_rng::<String, _>($rng)
            }
            Locale::FrFr => {
                let $l = FR_FR;
                $faker.fake_with_rng::<String, _>($rng)
            }
            Locale::DeDe => {
                let $l = DE_DE;
                $faker.fake_with_rng::<String, _>($rng)
            }
            Locale::PtBr => {
                let $l = PT_BR;
                $faker.fake_with_rng::<String, _>($rng)
            }
            Locale::JaJp => {
                let $l = JA_JP;
                $faker.fake_with_rng::<String, _>($rng)
            }
            Locale::ZhCn => {
                let $l = ZH_CN;
                $faker.fake_with_rng::<String, _>($rng)
            }
        }
    };
}

struct FakerState {
    rng: StdRng,
    issued: HashMap<String, HashSet<String>>,
}

/// Generator producing locale-aware fake values with the `fake` crate
pub struct FakeGenerator {
    locale: Locale,
    state: Mutex<FakerState>,
}

impl FakeGenerator {
    /// Creates a generator seeded from OS entropy
    pub fn new(locale: Locale) -> Self {
        Self::with_rng(locale, StdRng::from_os_rng())
    }

    /// Creates a generator with a fixed seed; output is reproducible per seed
    pub fn seeded(locale: Locale, seed: u64) -> Self {
        Self::with_rng(locale, StdRng::seed_from_u64(seed))
    }

    fn with_rng(locale: Locale, rng: StdRng) -> Self {
        Self {
            locale,
            state: Mutex::new(FakerState {
                rng,
                issued: HashMap::new(),
            }),
        }
    }

    /// Returns true if `name` is a known generator name
    pub fn supports(name: &str) -> bool {
        GENERATOR_NAMES.contains(&name)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FakerState>> {
        self.state
            .lock()
            .map_err(|_| VeilError::Generator("generator state poisoned".to_string()))
    }

    fn produce(&self, name: &str, rng: &mut StdRng) -> Result<SqlValue> {
        let locale = self.locale;
        let text = match name {
            "email" | "safe_email" => localized!(locale, rng, |l| SafeEmail(l)),
            "free_email" => localized!(locale, rng, |l| FreeEmail(l)),
            "username" => localized!(locale, rng, |l| Username(l)),
            "password" => localized!(locale, rng, |l| Password(l, 12..20)),
            "ipv4" => localized!(locale, rng, |l| IPv4(l)),
            "domain_suffix" => localized!(locale, rng, |l| DomainSuffix(l)),
            "first_name" => localized!(locale, rng, |l| FirstName(l)),
            "last_name" => localized!(locale, rng, |l| LastName(l)),
            "name" => localized!(locale, rng, |l| Name(l)),
            "phone_number" => localized!(locale, rng, |l| PhoneNumber(l)),
            "cell_number" => localized!(locale, rng, |l| CellNumber(l)),
            "street_name" => localized!(locale, rng, |l| StreetName(l)),
            "building_number" => localized!(locale, rng, |l| BuildingNumber(l)),
            "city" => localized!(locale, rng, |l| CityName(l)),
            "zip_code" => localized!(locale, rng, |l| ZipCode(l)),
            "post_code" => localized!(locale, rng, |l| PostCode(l)),
            "state" => localized!(locale, rng, |l| StateName(l)),
            "country" => localized!(locale, rng, |l| CountryName(l)),
            "company" => localized!(locale, rng, |l| CompanyName(l)),
            "buzzword" => localized!(locale, rng, |l| Buzzword(l)),
            "word" => localized!(locale, rng, |l| Word(l)),
            "sentence" => localized!(locale, rng, |l| Sentence(l, 4..10)),
            "paragraph" => localized!(locale, rng, |l| Paragraph(l, 2..5)),
            "credit_card" => localized!(locale, rng, |l| CreditCardNumber(l)),
            "uuid" => {
                let bytes: [u8; 16] = rng.random();
                uuid::Builder::from_random_bytes(bytes)
                    .into_uuid()
                    .to_string()
            }
            "number" => return Ok(SqlValue::Int(rng.random_range(0..1_000_000))),
            other => {
                return Err(VeilError::Generator(format!(
                    "unknown generator '{other}'"
                )))
            }
        };
        Ok(SqlValue::Text(text))
    }
}

impl Generator for FakeGenerator {
    fn generate(&self, name: &str) -> Result<SqlValue> {
        let mut state = self.lock()?;
        self.produce(name, &mut state.rng)
    }

    fn generate_unique(&self, name: &str) -> Result<SqlValue> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        for _ in 0..MAX_UNIQUE_ATTEMPTS {
            let value = self.produce(name, &mut state.rng)?;
            let issued = state.issued.entry(name.to_string()).or_default();
            if issued.insert(value.to_string()) {
                return Ok(value);
            }
        }
        Err(VeilError::Generator(format!(
            "could not produce a unique '{name}' after {MAX_UNIQUE_ATTEMPTS} attempts"
        )))
    }

    fn locale(&self) -> &str {
        self.locale.as_str()
    }
}

impl std::fmt::Debug for FakeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeGenerator")
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}
