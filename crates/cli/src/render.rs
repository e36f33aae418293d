//! Terminal rendering of the customer table, profile and notices.

use std::io::{self, Write};
use std::time::Instant;

use clap::ValueEnum;
use customer_desk_client::{NoticeBoard, NoticeKind, Profile};
use customer_desk_core::{Customer, SortDirection, SortKey, SortSpec, SortedView};

/// Table layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Theme {
    /// Padded columns with a rule under the header.
    #[default]
    Plain,
    /// Tight columns, no rule.
    Compact,
}

impl Theme {
    const fn separator(self) -> &'static str {
        match self {
            Self::Plain => " | ",
            Self::Compact => "  ",
        }
    }
}

/// A table column and the sort key it displays.
struct Column {
    label: &'static str,
    keys: &'static [SortKey],
}

const COLUMNS: [Column; 9] = [
    Column { label: "ID", keys: &[] },
    Column { label: "Title", keys: &[SortKey::Title] },
    Column { label: "Name", keys: &[SortKey::FirstName, SortKey::LastName] },
    Column { label: "Email", keys: &[SortKey::Email] },
    Column { label: "City", keys: &[SortKey::City] },
    Column { label: "Mobile", keys: &[SortKey::Mobile] },
    Column { label: "Company", keys: &[SortKey::CompanyName] },
    Column { label: "Credit Limit", keys: &[SortKey::CreditLimit] },
    Column { label: "Credit Period", keys: &[SortKey::CreditPeriod] },
];

/// Renders a [`SortedView`] as a text table.
#[derive(Debug, Clone, Copy)]
pub struct TableRenderer {
    theme: Theme,
}

impl TableRenderer {
    pub const fn new(theme: Theme) -> Self {
        Self { theme }
    }

    /// Display cells of one customer, in column order.
    pub fn cells(customer: &Customer) -> [String; 9] {
        [
            customer.id.to_string(),
            customer.title.to_string(),
            customer.full_name(),
            customer.email.to_string(),
            customer.city.clone(),
            customer.mobile.clone(),
            customer
                .company_name
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            format!("{:.2}", customer.credit_limit),
            format!("{} days", customer.credit_period),
        ]
    }

    fn headers(spec: SortSpec) -> [String; 9] {
        COLUMNS.map(|column| {
            let marker = match (spec.key(), spec.direction()) {
                (Some(key), Some(direction)) if column.keys.contains(&key) => match direction {
                    SortDirection::Ascending => " ^",
                    SortDirection::Descending => " v",
                },
                _ => "",
            };
            format!("{}{marker}", column.label)
        })
    }

    pub fn render(&self, out: &mut impl Write, view: &SortedView<'_>) -> io::Result<()> {
        if view.is_empty() {
            return writeln!(out, "No customers found.");
        }

        let headers = Self::headers(view.spec());
        let rows: Vec<[String; 9]> = view.iter().map(Self::cells).collect();

        let mut widths = headers.each_ref().map(|h| h.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        self.write_row(out, &headers, &widths)?;
        if self.theme == Theme::Plain {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            writeln!(out, "{}", rule.join("-+-"))?;
        }
        for row in &rows {
            self.write_row(out, row, &widths)?;
        }
        Ok(())
    }

    fn write_row(&self, out: &mut impl Write, cells: &[String; 9], widths: &[usize; 9]) -> io::Result<()> {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        writeln!(out, "{}", padded.join(self.theme.separator()).trim_end())
    }
}

pub fn render_profile(out: &mut impl Write, profile: &Profile) -> io::Result<()> {
    writeln!(out, "Username: {}", profile.username)?;
    for (key, value) in &profile.extra {
        match value.as_str() {
            Some(text) => writeln!(out, "{key}: {text}")?,
            None => writeln!(out, "{key}: {value}")?,
        }
    }
    Ok(())
}

/// Write the current notice, if one is still visible.
pub fn render_notice(out: &mut impl Write, notices: &mut NoticeBoard) -> io::Result<()> {
    if let Some(notice) = notices.current(Instant::now()) {
        let label = match notice.kind {
            NoticeKind::Success => "OK",
            NoticeKind::Error => "ERROR",
        };
        writeln!(out, "[{label}] {}", notice.message)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn customer(id: i64, company: Option<&str>) -> Customer {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": "Ms",
            "customer_category": "Domestic",
            "first_name": "Kamala",
            "last_name": "Silva",
            "email": format!("kamala{id}@example.lk"),
            "address_1": "1 Lake Drive",
            "city": "Colombo",
            "mobile": "0711234567",
            "company_name": company,
            "credit_limit": "1500.5",
            "credit_period": 30
        }))
        .unwrap()
    }

    fn render(theme: Theme, customers: &[Customer], spec: SortSpec) -> String {
        let view = SortedView::new(customers, spec, "");
        let mut out = Vec::new();
        TableRenderer::new(theme).render(&mut out, &view).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cells() {
        let cells = TableRenderer::cells(&customer(7, None));
        assert_eq!(cells[0], "7");
        assert_eq!(cells[2], "Kamala Silva");
        assert_eq!(cells[6], "-");
        assert_eq!(cells[7], "1500.50");
        assert_eq!(cells[8], "30 days");
    }

    #[test]
    fn test_empty_view() {
        assert_eq!(
            render(Theme::Plain, &[], SortSpec::default()),
            "No customers found.\n"
        );
    }

    #[test]
    fn test_plain_has_rule_and_sort_marker() {
        let customers = [customer(1, Some("Silva & Co")), customer(2, None)];
        let text = render(
            Theme::Plain,
            &customers,
            SortSpec::by(SortKey::CreditLimit, SortDirection::Descending),
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Credit Limit v"));
        assert!(lines[1].starts_with("--"));
        assert!(lines[2].contains("Silva & Co"));
    }

    #[test]
    fn test_compact_has_no_rule() {
        let customers = [customer(1, None)];
        let text = render(Theme::Compact, &customers, SortSpec::by(SortKey::LastName, SortDirection::Ascending));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Name ^"));
        assert!(!lines[0].contains(" | "));
    }
}
