use crate::types::Event;

pub const CSV_HEADER: &str = "Title,Venue,Date,Start Time,End Time,Status,Payment Status,\
Contact Name,Contact Phone,Contact Email,Notes,Created By";

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Renders events as CSV with every field quoted. The header is always newline-terminated.
#[must_use]
pub fn events_to_csv(events: &[Event]) -> String {
    let rows = events.iter().map(|event| {
        let created_by = event
            .created_by
            .as_ref()
            .and_then(|a| a.display_name.as_deref())
            .unwrap_or_default();

        let fields: [&str; 12] = [
            &event.title,
            &event.venue,
            &event.date,
            &event.start_time,
            &event.end_time,
            &event.status,
            &event.payment_status,
            &event.contact.name,
            &event.contact.phone,
            &event.contact.email,
            event.notes.as_deref().unwrap_or_default(),
            created_by,
        ];

        fields
            .iter()
            .map(|field| quote(field))
            .collect::<Vec<_>>()
            .join(",")
    });

    format!("{CSV_HEADER}\n{}", rows.collect::<Vec<_>>().join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attribution, Contact, Role};
    use chrono::Utc;

    fn event(title: &str, notes: Option<&str>) -> Event {
        Event {
            id: "e1".to_string(),
            tenant_id: Some("acme".to_string()),
            title: title.to_string(),
            venue: "Main Hall".to_string(),
            venue_id: "main".to_string(),
            color: None,
            date: "2025-06-01".to_string(),
            start_time: "18:00".to_string(),
            end_time: "23:00".to_string(),
            status: "confirmed".to_string(),
            payment_status: "paid".to_string(),
            payment_method: None,
            contact: Contact {
                name: "Ana".to_string(),
                phone: "555".to_string(),
                email: "ana@example.com".to_string(),
            },
            pricing: None,
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: Some(Attribution {
                user_id: "EVN001".to_string(),
                display_name: Some("Ana Ruiz".to_string()),
                role: Some(Role::Admin),
            }),
            updated_by: None,
        }
    }

    #[test]
    fn test_header_only_when_empty() {
        assert_eq!(events_to_csv(&[]), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn test_quotes_are_doubled() {
        let csv = events_to_csv(&[event("The \"Big\" Night", None)]);
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some(
                "\"The \"\"Big\"\" Night\",\"Main Hall\",\"2025-06-01\",\"18:00\",\"23:00\",\
                 \"confirmed\",\"paid\",\"Ana\",\"555\",\"ana@example.com\",\"\",\"Ana Ruiz\""
            )
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_embedded_newlines_stay_inside_quotes() {
        let csv = events_to_csv(&[event("Gala", Some("line one\nline two"))]);
        assert!(csv.contains("\"line one\nline two\""));
    }
}
