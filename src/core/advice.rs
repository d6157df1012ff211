use super::types::{
    Advice, AdviceInput, DebtRate, EmergencyFund, Recommendation, RetirementHorizon,
    WithdrawalReason,
};

struct Rule {
    applies: fn(&AdviceInput) -> bool,
    weight: i32,
    reason: &'static str,
    alternative: Option<&'static str>,
}

// Evaluated top to bottom; every matching rule contributes. The reason rules
// are mutually exclusive, so at most one of the first five fires.
const RULES: &[Rule] = &[
    Rule {
        applies: |input| input.reason == WithdrawalReason::Emergency,
        weight: 3,
        reason: "Emergency situations may justify a withdrawal",
        alternative: None,
    },
    Rule {
        applies: |input| input.reason == WithdrawalReason::Debt && input.debt_rate == DebtRate::High,
        weight: 2,
        reason: "Paying off high-interest debt (20%+) can save you money long-term",
        alternative: None,
    },
    Rule {
        applies: |input| {
            input.reason == WithdrawalReason::Debt && input.debt_rate == DebtRate::Medium
        },
        weight: 1,
        reason: "Medium-interest debt - consider if the savings outweigh retirement impact",
        alternative: None,
    },
    Rule {
        applies: |input| input.reason == WithdrawalReason::Expense,
        weight: -2,
        reason: "Large expenses are usually better funded through savings or loans",
        alternative: None,
    },
    Rule {
        applies: |input| input.reason == WithdrawalReason::Investment,
        weight: -1,
        reason: "Investment returns are uncertain - retirement savings offer tax benefits",
        alternative: None,
    },
    Rule {
        applies: |input| input.emergency_fund == EmergencyFund::No,
        weight: -2,
        reason: "No emergency fund - withdrawing now leaves you more vulnerable",
        alternative: Some("Consider building an emergency fund first (3-6 months expenses)"),
    },
    Rule {
        applies: |input| input.emergency_fund == EmergencyFund::Partial,
        weight: -1,
        reason: "Limited emergency savings - use with caution",
        alternative: None,
    },
    Rule {
        applies: |input| input.horizon == RetirementHorizon::Far,
        weight: 1,
        reason: "20+ years to retirement gives time to rebuild savings",
        alternative: None,
    },
    Rule {
        applies: |input| input.horizon == RetirementHorizon::Close,
        weight: -2,
        reason: "Less than 10 years to retirement - harder to rebuild savings",
        alternative: None,
    },
];

pub const GENERAL_ALTERNATIVES: [&str; 5] = [
    "Personal loan (if interest rate is lower than retirement fund growth)",
    "Negotiate payment plans with creditors",
    "Sell unused assets",
    "Side income or gig work",
    "Family loan (interest-free)",
];

/// Weighted score and the reasons that produced it, in rule order.
pub fn score(input: &AdviceInput) -> (i32, Vec<&'static str>) {
    let mut total = 0;
    let mut reasons = Vec::new();
    for rule in RULES.iter().filter(|rule| (rule.applies)(input)) {
        total += rule.weight;
        reasons.push(rule.reason);
    }
    (total, reasons)
}

pub fn classify(score: i32) -> Recommendation {
    if score >= 3 {
        Recommendation::ConsiderWithdrawing
    } else if score >= 0 {
        Recommendation::ProceedWithCaution
    } else {
        Recommendation::AvoidIfPossible
    }
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::ConsiderWithdrawing => "Consider Withdrawing",
            Recommendation::ProceedWithCaution => "Proceed with Caution",
            Recommendation::AvoidIfPossible => "Avoid if Possible",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Recommendation::ConsiderWithdrawing => "green",
            Recommendation::ProceedWithCaution => "yellow",
            Recommendation::AvoidIfPossible => "red",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Recommendation::ConsiderWithdrawing => {
                "Based on your situation, a withdrawal may be reasonable. However, always consider alternatives first and only withdraw what you absolutely need."
            }
            Recommendation::ProceedWithCaution => {
                "Your situation is borderline. Carefully weigh the short-term benefit against long-term retirement impact. Explore all alternatives before proceeding."
            }
            Recommendation::AvoidIfPossible => {
                "Based on your situation, withdrawing now could seriously harm your retirement savings. Strongly consider alternatives."
            }
        }
    }
}

pub fn advise(input: &AdviceInput) -> Advice {
    let (score, reasons) = score(input);
    let recommendation = classify(score);

    let mut alternatives: Vec<&'static str> = RULES
        .iter()
        .filter(|rule| (rule.applies)(input))
        .filter_map(|rule| rule.alternative)
        .collect();
    if alternatives.is_empty() {
        alternatives = GENERAL_ALTERNATIVES.to_vec();
    }

    Advice {
        score,
        recommendation,
        label: recommendation.label(),
        color: recommendation.color(),
        summary: recommendation.summary(),
        reasons,
        alternatives,
    }
}
