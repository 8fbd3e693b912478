use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};

use fna_studio::wizard::{
    available_slots, format_price, new_confirmation_number, AddOnSnapshot, BookingDraft,
    ClientDetails, ServiceSnapshot, WizardStep, DAY_SLOTS, LUNCH_SLOT,
};

fn pedicure() -> ServiceSnapshot {
    ServiceSnapshot {
        id: "svc-1".to_string(),
        name: "Luxury Spa Pedicure".to_string(),
        price: 65.0,
        duration_minutes: 90,
    }
}

fn add_on(id: &str, name: &str, price: f64) -> AddOnSnapshot {
    AddOnSnapshot {
        id: id.to_string(),
        name: name.to_string(),
        price,
        description: String::new(),
    }
}

fn valid_client() -> ClientDetails {
    ClientDetails {
        name: "Robin Doe".to_string(),
        email: "robin@example.com".to_string(),
        phone: "(503) 555-0101".to_string(),
        notes: String::new(),
    }
}

fn next_weekday(mut date: NaiveDate, weekday: Weekday) -> NaiveDate {
    while date.weekday() != weekday {
        date = date.succ_opt().expect("date overflow");
    }
    date
}

#[test]
fn forward_transition_requires_valid_stage() {
    let mut draft = BookingDraft::new();
    assert!(draft.next().is_err());
    assert_eq!(draft.step, WizardStep::ServiceSelection);

    draft.service = Some(pedicure());
    assert_eq!(draft.next().unwrap(), WizardStep::AddOnSelection);

    // Skipping add-ons is a valid forward transition.
    assert_eq!(draft.next().unwrap(), WizardStep::DateTime);
    assert!(draft.add_ons.is_empty());

    assert!(draft.next().is_err());
    draft.appointment_date = Some(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
    draft.appointment_time = Some("10:00 AM".to_string());
    assert_eq!(draft.next().unwrap(), WizardStep::ClientInfo);

    assert!(draft.next().is_err());
    draft.client = valid_client();
    assert_eq!(draft.next().unwrap(), WizardStep::Review);

    // The review stage only leaves forward through confirm().
    assert!(draft.next().is_err());
    draft.confirm().unwrap();
    assert_eq!(draft.step, WizardStep::Confirmation);
}

#[test]
fn client_info_rejects_bad_email_and_phone() {
    let mut draft = BookingDraft::new();
    draft.step = WizardStep::ClientInfo;
    draft.client = ClientDetails {
        name: "Robin".to_string(),
        email: "not-an-email".to_string(),
        phone: "12".to_string(),
        notes: String::new(),
    };
    let errors = draft.validate_step(WizardStep::ClientInfo);
    assert_eq!(errors.len(), 2);
}

#[test]
fn backward_transition_preserves_entered_data() {
    let mut draft = BookingDraft::new();
    draft.service = Some(pedicure());
    draft.next().unwrap();
    draft.add_ons.push(add_on("a1", "Nail Art Accent", 15.0));
    draft.next().unwrap();

    assert_eq!(draft.prev(), WizardStep::AddOnSelection);
    assert_eq!(draft.prev(), WizardStep::ServiceSelection);
    assert_eq!(draft.prev(), WizardStep::ServiceSelection);

    assert!(draft.service.is_some());
    assert_eq!(draft.add_ons.len(), 1);
}

#[test]
fn confirmed_booking_cannot_navigate_backward() {
    let mut draft = BookingDraft::new();
    draft.service = Some(pedicure());
    draft.appointment_date = Some(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
    draft.appointment_time = Some("10:00 AM".to_string());
    draft.client = valid_client();
    draft.step = WizardStep::Review;
    draft.confirm().unwrap();

    // The persisted booking cannot be un-inserted; a fresh draft starts over.
    assert_eq!(draft.prev(), WizardStep::Confirmation);
    assert_eq!(draft.step, WizardStep::Confirmation);
}

#[test]
fn go_to_step_only_reaches_earlier_stages() {
    let mut draft = BookingDraft::new();
    draft.service = Some(pedicure());
    draft.next().unwrap();
    draft.next().unwrap();
    draft.appointment_date = Some(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
    draft.appointment_time = Some("10:00 AM".to_string());
    draft.next().unwrap();
    draft.client = valid_client();
    draft.next().unwrap();
    assert_eq!(draft.step, WizardStep::Review);

    assert!(draft.go_to_step(WizardStep::Confirmation).is_err());
    assert!(draft.go_to_step(WizardStep::Review).is_err());
    assert_eq!(
        draft.go_to_step(WizardStep::AddOnSelection).unwrap(),
        WizardStep::AddOnSelection
    );
    assert!(draft.service.is_some());
}

#[test]
fn total_is_service_plus_add_ons_at_every_stage() {
    let mut draft = BookingDraft::new();
    draft.service = Some(pedicure());
    draft.add_ons.push(add_on("a1", "Nail Art Accent", 15.0));
    draft.add_ons.push(add_on("a2", "Chrome Finish", 35.0));

    let at_add_ons = draft.total();
    draft.step = WizardStep::Review;
    let at_review = draft.total();
    draft.step = WizardStep::Confirmation;
    let at_confirmation = draft.total();

    assert_eq!(at_add_ons, 115.0);
    assert_eq!(at_add_ons, at_review);
    assert_eq!(at_review, at_confirmation);
    assert_eq!(draft.add_ons_total(), 50.0);
    assert_eq!(format_price(draft.total()), "$115.00");
}

#[test]
fn confirmation_numbers_match_format_and_regenerate() {
    let first = new_confirmation_number();
    let second = new_confirmation_number();

    for number in [&first, &second] {
        assert_eq!(number.len(), 13);
        assert!(number.starts_with("FNA-"));
        assert!(number[4..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
    assert_ne!(first, second);
}

#[test]
fn sundays_have_no_slots() {
    let sunday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Sun);
    assert!(available_slots(sunday, &HashSet::new()).is_empty());
}

#[test]
fn lunch_slot_is_never_offered() {
    let tuesday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Tue);
    let slots = available_slots(tuesday, &HashSet::new());
    assert!(!slots.contains(&LUNCH_SLOT));
    assert!(slots.contains(&"10:00 AM"));
}

#[test]
fn booked_slots_are_excluded() {
    let tuesday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Tue);
    let mut booked = HashSet::new();
    booked.insert("10:00 AM".to_string());
    let slots = available_slots(tuesday, &booked);
    assert!(!slots.contains(&"10:00 AM"));
    assert!(slots.contains(&"11:00 AM"));
}

#[test]
fn day_with_only_lunch_remaining_reports_zero_slots() {
    let tuesday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Tue);
    let booked: HashSet<String> = DAY_SLOTS
        .iter()
        .filter(|slot| **slot != LUNCH_SLOT)
        .map(|slot| slot.to_string())
        .collect();
    assert!(available_slots(tuesday, &booked).is_empty());
}
