//! Keyword-based category and document type rules.

/// Category and document type pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: &'static str,
    pub document_type: &'static str,
}

/// Ordered rules; the first rule with any matching phrase wins.
const RULES: &[(&[&str], Classification)] = &[
    (
        &["each student", "practical project", "final project report"],
        Classification {
            category: "Academic",
            document_type: "Assignment/Instructions",
        },
    ),
    (
        &["invoice", "total", "tax"],
        Classification {
            category: "Financial",
            document_type: "Invoice",
        },
    ),
    (
        &["contract", "agreement"],
        Classification {
            category: "Legal",
            document_type: "Contract",
        },
    ),
];

const FALLBACK: Classification = Classification {
    category: "General",
    document_type: "Document",
};

pub fn classify(text: &str) -> Classification {
    let lowered = text.to_lowercase();
    RULES
        .iter()
        .find(|(phrases, _)| phrases.iter().any(|p| lowered.contains(p)))
        .map(|(_, class)| *class)
        .unwrap_or(FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order_financial_before_legal() {
        let class = classify("This invoice is attached to the contract.");
        assert_eq!(class.category, "Financial");
        assert_eq!(class.document_type, "Invoice");
        assert_eq!(classify("This invoice is attached to the contract."), class);
    }

    #[test]
    fn test_academic_first() {
        let class = classify("Each student must submit the final project report with tax forms.");
        assert_eq!(class.category, "Academic");
        assert_eq!(class.document_type, "Assignment/Instructions");
    }

    #[test]
    fn test_legal() {
        assert_eq!(classify("Non-disclosure AGREEMENT").category, "Legal");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(classify("meeting notes"), FALLBACK);
    }
}
