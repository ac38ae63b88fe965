//! Student profile page parsing.
//!
//! The profile page lists its details as a series of `div.form-group` blocks
//! inside `div.elem-info-wrapper`, each holding a `label.lbl-title-light` key
//! followed by a value label. Email and phone live in the value attributes of
//! the `#updateMail` and `#updateContact` inputs.
//!
//! Every field is extracted independently. Only a page that lacks the details
//! container altogether (or yields nothing at all) is a parse error.

use crate::portal::{
    error::ProfileParseError,
    types::{ProfileData, ProfileField},
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::{collections::BTreeSet, sync::LazyLock};
use tracing::{debug, warn};

const CONTAINER_SELECTOR: &str = "div.elem-info-wrapper";
const GROUP_SELECTOR: &str = "div.form-group";
const KEY_SELECTOR: &str = "label.lbl-title-light";
const VALUE_SELECTOR: &str = "label.lbl-title-light + label";
const EMAIL_SELECTOR: &str = "#updateMail";
const PHONE_SELECTOR: &str = "#updateContact";

/// Campus codes embedded in the PRN (`PES<code>...`).
const CAMPUSES: [(u32, &str); 2] = [(1, "RR"), (2, "EC")];

static PRN_CAMPUS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^PES(\d)").ok());

/// Branch names as shown on the profile page and their abbreviations.
const BRANCH_SHORT_CODES: [(&str, &str); 7] = [
    ("computer science and engineering", "CSE"),
    ("computer science and engineering (ai & ml)", "CSE (AI&ML)"),
    ("electronics and communication engineering", "ECE"),
    ("electrical and electronics engineering", "EEE"),
    ("mechanical engineering", "ME"),
    ("biotechnology", "BT"),
    ("civil engineering", "CV"),
];

fn header_to_field(header: &str) -> Option<ProfileField> {
    match header {
        "Name" => Some(ProfileField::Name),
        "PESU Id" => Some(ProfileField::Prn),
        "SRN" => Some(ProfileField::Srn),
        "Program" => Some(ProfileField::Program),
        "Branch" => Some(ProfileField::Branch),
        "Semester" => Some(ProfileField::Semester),
        "Section" => Some(ProfileField::Section),
        _ => None,
    }
}

#[must_use]
pub fn campus_name(code: u32) -> Option<&'static str> {
    CAMPUSES
        .iter()
        .find(|(campus_code, _)| *campus_code == code)
        .map(|(_, name)| *name)
}

#[must_use]
pub fn branch_short_code(branch: &str) -> Option<&'static str> {
    let branch = branch.trim().to_lowercase();
    BRANCH_SHORT_CODES
        .iter()
        .find(|(name, _)| *name == branch)
        .map(|(_, code)| *code)
}

/// Campus code from a PRN such as `PES1201800001`.
#[must_use]
pub fn campus_code(prn: &str) -> Option<u32> {
    PRN_CAMPUS
        .as_ref()?
        .captures(prn)
        .and_then(|captures| captures.get(1))
        .and_then(|code| code.as_str().parse().ok())
}

fn selector(css: &str) -> Result<Selector, ProfileParseError> {
    // The selectors above are constants; a failure here means the page cannot be read.
    Selector::parse(css).map_err(|_| ProfileParseError::MissingContainer)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn attr_value(document: &Html, css: &str) -> Result<Option<String>, ProfileParseError> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .next()
        .and_then(|node| node.value().attr("value"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string))
}

/// Parse a profile page, extracting only `fields` when given.
///
/// # Errors
/// Returns [`ProfileParseError`] when the page is not a profile page.
pub fn parse(
    html: &str,
    fields: Option<&BTreeSet<ProfileField>>,
) -> Result<ProfileData, ProfileParseError> {
    let wants = |field: ProfileField| fields.map_or(true, |fields| fields.contains(&field));
    let need_prn = wants(ProfileField::Prn) || wants(ProfileField::CampusCode) || wants(ProfileField::Campus);
    let need_branch = wants(ProfileField::Branch) || wants(ProfileField::BranchShortCode);

    let document = Html::parse_document(html);
    let container = document
        .select(&selector(CONTAINER_SELECTOR)?)
        .next()
        .ok_or(ProfileParseError::MissingContainer)?;

    let group_selector = selector(GROUP_SELECTOR)?;
    let key_selector = selector(KEY_SELECTOR)?;
    let value_selector = selector(VALUE_SELECTOR)?;

    let mut profile = ProfileData::default();
    let mut found_any = false;

    for (index, group) in container.select(&group_selector).enumerate() {
        let Some(key) = group.select(&key_selector).next().map(text_of) else {
            debug!(index, "profile field without a key label");
            continue;
        };
        let Some(field) = header_to_field(&key) else {
            debug!(index, key = %key, "skipping unknown profile field");
            continue;
        };
        let Some(value) = group
            .select(&value_selector)
            .next()
            .map(text_of)
            .filter(|value| !value.is_empty())
        else {
            debug!(index, key = %key, "profile field without a value");
            continue;
        };

        found_any = true;

        match field {
            ProfileField::Name if wants(field) => profile.name = Some(value),
            ProfileField::Prn if need_prn => profile.prn = Some(value),
            ProfileField::Srn if wants(field) => profile.srn = Some(value),
            ProfileField::Program if wants(field) => profile.program = Some(value),
            ProfileField::Branch if need_branch => profile.branch = Some(value),
            ProfileField::Semester if wants(field) => profile.semester = Some(value),
            ProfileField::Section if wants(field) => profile.section = Some(value),
            _ => {}
        }
    }

    if wants(ProfileField::Email) {
        profile.email = attr_value(&document, EMAIL_SELECTOR)?;
    }
    if wants(ProfileField::Phone) {
        profile.phone = attr_value(&document, PHONE_SELECTOR)?;
    }
    found_any |= profile.email.is_some() || profile.phone.is_some();

    if !found_any {
        return Err(ProfileParseError::Empty);
    }

    if wants(ProfileField::BranchShortCode) {
        profile.branch_short_code = profile
            .branch
            .as_deref()
            .and_then(branch_short_code)
            .map(str::to_string);
    }

    if let Some(code) = profile.prn.as_deref().and_then(campus_code) {
        profile.campus_code = Some(code);
        profile.campus = campus_name(code).map(str::to_string);
        if profile.campus.is_none() {
            warn!(campus_code = code, "unknown campus code");
        }
    }

    let profile = match fields {
        Some(fields) => profile.retain(fields),
        None => profile,
    };

    // The requested fields may all be absent, e.g. only `campus` for an unmapped code.
    if profile.is_empty() {
        return Err(ProfileParseError::Empty);
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn profile_page(prn: &str, phone: Option<&str>) -> String {
        let phone = phone.map_or_else(String::new, |phone| {
            format!(r#"<input type="text" id="updateContact" value="{phone}">"#)
        });
        format!(
            r#"<html><body>
            <div class="elem-info-wrapper">
              <div class="form-group"><label class="lbl-title-light">Name</label><label>John Doe</label></div>
              <div class="form-group"><label class="lbl-title-light">PESU Id</label><label>{prn}</label></div>
              <div class="form-group"><label class="lbl-title-light">SRN</label><label>PES1UG20CS001</label></div>
              <div class="form-group"><label class="lbl-title-light">Program</label><label>Bachelor of Technology</label></div>
              <div class="form-group"><label class="lbl-title-light">Branch</label><label>Computer Science and Engineering</label></div>
              <div class="form-group"><label class="lbl-title-light">Semester</label><label>Sem-2</label></div>
              <div class="form-group"><label class="lbl-title-light">Section</label><label>Section C</label></div>
            </div>
            <input type="email" id="updateMail" value=" johndoe@gmail.com ">
            {phone}
            </body></html>"#
        )
    }

    #[test]
    fn parses_full_page() -> Result<()> {
        let profile = parse(&profile_page("PES1201800001", Some("1234567890")), None)?;
        assert_eq!(profile.name.as_deref(), Some("John Doe"));
        assert_eq!(profile.prn.as_deref(), Some("PES1201800001"));
        assert_eq!(profile.srn.as_deref(), Some("PES1UG20CS001"));
        assert_eq!(profile.program.as_deref(), Some("Bachelor of Technology"));
        assert_eq!(profile.branch.as_deref(), Some("Computer Science and Engineering"));
        assert_eq!(profile.branch_short_code.as_deref(), Some("CSE"));
        assert_eq!(profile.semester.as_deref(), Some("Sem-2"));
        assert_eq!(profile.section.as_deref(), Some("Section C"));
        assert_eq!(profile.email.as_deref(), Some("johndoe@gmail.com"));
        assert_eq!(profile.phone.as_deref(), Some("1234567890"));
        assert_eq!(profile.campus_code, Some(1));
        assert_eq!(profile.campus.as_deref(), Some("RR"));
        Ok(())
    }

    #[test]
    fn missing_phone_is_omitted() -> Result<()> {
        let profile = parse(&profile_page("PES2201800001", None), None)?;
        assert!(profile.phone.is_none());
        assert_eq!(profile.campus.as_deref(), Some("EC"));
        let value = serde_json::to_value(&profile)?;
        assert!(value.get("phone").is_none());
        Ok(())
    }

    #[test]
    fn unknown_campus_code_keeps_number() -> Result<()> {
        let profile = parse(&profile_page("PES9201800001", None), None)?;
        assert_eq!(profile.campus_code, Some(9));
        assert!(profile.campus.is_none());
        Ok(())
    }

    #[test]
    fn field_selection_limits_output() -> Result<()> {
        let fields = BTreeSet::from([ProfileField::Name, ProfileField::Srn]);
        let profile = parse(&profile_page("PES1201800001", Some("1")), Some(&fields))?;
        let value = serde_json::to_value(&profile)?;
        let keys: Vec<_> = value
            .as_object()
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default();
        assert_eq!(keys, vec!["name".to_string(), "srn".to_string()]);
        Ok(())
    }

    #[test]
    fn campus_alone_does_not_leak_prn() -> Result<()> {
        let fields = BTreeSet::from([ProfileField::Campus]);
        let profile = parse(&profile_page("PES1201800001", None), Some(&fields))?;
        assert_eq!(profile.campus.as_deref(), Some("RR"));
        assert!(profile.prn.is_none());
        assert!(profile.campus_code.is_none());
        Ok(())
    }

    #[test]
    fn selection_with_nothing_to_report_is_an_error() {
        let fields = BTreeSet::from([ProfileField::Campus]);
        assert_eq!(
            parse(&profile_page("PES9201800001", None), Some(&fields)),
            Err(ProfileParseError::Empty)
        );
    }

    #[test]
    fn missing_container_is_an_error() {
        let html = "<html><body><div class='login-form'></div></body></html>";
        assert_eq!(parse(html, None), Err(ProfileParseError::MissingContainer));
    }

    #[test]
    fn empty_container_is_an_error() {
        let html = "<html><body><div class='elem-info-wrapper'></div></body></html>";
        assert_eq!(parse(html, None), Err(ProfileParseError::Empty));
    }

    #[test]
    fn unknown_and_empty_groups_are_skipped() -> Result<()> {
        let html = r#"<div class="elem-info-wrapper">
            <div class="form-group"><label class="lbl-title-light">Hostel</label><label>Block A</label></div>
            <div class="form-group"><label class="lbl-title-light">Section</label><label> </label></div>
            <div class="form-group"><label class="lbl-title-light">Name</label><label>Jane</label></div>
        </div>"#;
        let profile = parse(html, None)?;
        assert_eq!(profile.name.as_deref(), Some("Jane"));
        assert!(profile.section.is_none());
        Ok(())
    }

    #[test]
    fn branch_codes() {
        assert_eq!(branch_short_code("Electronics and Communication Engineering"), Some("ECE"));
        assert_eq!(branch_short_code("Underwater Basket Weaving"), None);
    }

    #[test]
    fn campus_code_requires_pes_prefix() {
        assert_eq!(campus_code("PES1201800001"), Some(1));
        assert_eq!(campus_code("XPES1"), None);
        assert_eq!(campus_code("PESX"), None);
    }
}
