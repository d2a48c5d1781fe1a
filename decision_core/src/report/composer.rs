// decision_core/src/report/composer.rs

use crate::contracts::AnalysisError;
use crate::data_models::features::{PageFeatures, PageType};
use crate::invariants::{ensure_non_empty_trimmed, ensure_score_scale, ensure_unit_interval};
use crate::data_models::memory::{DecisionHistoryInsight, FatigueLevel};
use crate::data_models::outcome::{BrandContext, StageAssessment};
use crate::data_models::report::{
    ActionableRecommendations, ContextSnapshot, DecisionFailureBreakdown,
    ExecutiveDecisionSummary, NextDiagnosticStep, RecommendationItem, ReportSections,
    WhatThisWillImprove, WhatToFixFirst,
};
use crate::data_models::request::{Goal, Locale};
use crate::engine::EngineVerdict;
use crate::llm_client::ProseGenerator;
use crate::report::lint::{check_prose, section_headings};
use std::time::Duration;

pub struct ComposeInput<'a> {
    pub verdict: &'a EngineVerdict,
    pub features: &'a PageFeatures,
    pub brand: &'a BrandContext,
    pub stage: &'a StageAssessment,
    pub insight: Option<&'a DecisionHistoryInsight>,
    pub goal: Goal,
    pub locale: Locale,
}

pub struct ComposedReport {
    pub sections: ReportSections,
    pub human_report: String,
    pub used_fallback: bool,
    pub errors: Vec<AnalysisError>,
}

/// # NDOC
/// component: `report::composer`
/// purpose: Assemble the machine twin first; only a validated twin earns a
///          prose pass. The response is complete with or without the LLM.
/// invariants:
///   - Exactly seven sections, fixed order.
///   - Prose that fails the lint is discarded for the deterministic fallback.
pub async fn compose(
    input: ComposeInput<'_>,
    prose_generator: &dyn ProseGenerator,
    deadline: Duration,
) -> ComposedReport {
    let sections = build_sections(&input);
    let mut errors = Vec::new();

    // The machine twin is the enforcement point: only a valid twin earns a
    // prose pass.
    if let Err(e) = validate_twin(&sections) {
        let error = AnalysisError::internal(format!("report twin invalid: {}", e.message));
        log::error!(target: "composer", "{}", error);
        errors.push(error);
        return ComposedReport {
            human_report: fallback_prose(&sections, input.locale),
            sections,
            used_fallback: true,
            errors,
        };
    }

    let prompt = build_prompt(&sections, input.locale, input.brand.is_enterprise_aware());
    let (human_report, used_fallback) =
        match prose_generator.generate(&prompt, deadline).await {
            Ok(prose) => {
                match check_prose(&prose, input.locale, input.brand.is_enterprise_aware()) {
                    Ok(()) => (prose, false),
                    Err(reason) => {
                        log::warn!(target: "composer", "prose rejected: {}", reason);
                        (fallback_prose(&sections, input.locale), true)
                    }
                }
            }
            Err(e) => {
                errors.push(e);
                (fallback_prose(&sections, input.locale), true)
            }
        };

    ComposedReport {
        sections,
        human_report,
        used_fallback,
        errors,
    }
}

fn validate_twin(sections: &ReportSections) -> Result<(), AnalysisError> {
    ensure_score_scale(
        sections.executive_decision_summary.confidence,
        "primary_confidence",
    )?;
    ensure_unit_interval(
        sections.context_snapshot.business_type_confidence,
        "business_type_confidence",
    )?;
    ensure_unit_interval(
        sections.context_snapshot.decision_stage_confidence,
        "decision_stage_confidence",
    )?;
    ensure_unit_interval(
        sections.context_snapshot.brand_maturity_confidence,
        "brand_maturity_confidence",
    )?;
    ensure_non_empty_trimmed(&sections.what_to_fix_first.intervention, "intervention")?;
    ensure_non_empty_trimmed(
        &sections.executive_decision_summary.primary_blocker,
        "primary_blocker",
    )?;
    Ok(())
}

fn build_sections(input: &ComposeInput<'_>) -> ReportSections {
    let verdict = input.verdict;
    let primary = &verdict.primary;

    let executive_decision_summary = ExecutiveDecisionSummary {
        primary_blocker: primary.blocker.label().to_string(),
        category: primary.category.as_str().to_string(),
        confidence: primary.confidence,
        findings_limited: verdict.findings_limited,
    };

    let context_snapshot = ContextSnapshot {
        business_type: input.features.page_type.as_str().to_string(),
        business_type_confidence: input.features.page_type_confidence,
        page_intent: input.features.page_intent.as_str().to_string(),
        decision_stage: input.stage.stage.as_str().to_string(),
        decision_stage_confidence: input.stage.confidence,
        brand_maturity: input.brand.brand_maturity.as_str().to_string(),
        brand_maturity_confidence: input.brand.confidence,
    };

    let primary_text = format!(
        "{} The friction concentrates at {}.",
        primary.why, primary.r#where
    );
    let decision_failure_breakdown = DecisionFailureBreakdown {
        primary: primary_text,
        secondary: verdict
            .secondary
            .as_ref()
            .map(|s| format!("{} The friction concentrates at {}.", s.why, s.r#where)),
        interaction: verdict.secondary.as_ref().map(|s| {
            format!(
                "{} compounds {}: each makes the other costlier to ignore at the {} stage.",
                s.blocker.label(),
                primary.blocker.label(),
                input.stage.stage.as_str()
            )
        }),
    };

    let what_to_fix_first = WhatToFixFirst {
        intervention: primary.what_to_change_first.clone(),
        rationale: format!(
            "{} is the highest-ranked blocker for a visitor at the {} stage; addressing anything else first leaves the main objection standing.",
            primary.blocker.label(),
            input.stage.stage.as_str()
        ),
        cost_of_inaction: format!(
            "Left alone, this keeps filtering out visitors whose goal is {}; each repeat visit reinforces the hesitation.",
            input.goal.as_str()
        ),
    };

    let actionable_recommendations = build_recommendations(input);

    let what_this_will_improve = WhatThisWillImprove {
        expected_lift: primary.expected_lift,
        expected_lift_label: primary.expected_lift.label().to_string(),
        behavioral_change: behavioral_change_text(input),
    };

    let critical_fatigue = input
        .insight
        .map(|i| i.fatigue.level == FatigueLevel::Critical)
        .unwrap_or(false);

    let next_diagnostic_step = NextDiagnosticStep {
        suggestion: if critical_fatigue {
            None
        } else {
            Some(next_step_suggestion(input))
        },
        redesign_call: if critical_fatigue {
            Some(
                "Diagnostic fatigue is critical for this context: the same cognitive blocker has been diagnosed repeatedly without movement. A redesign of the decision flow is the next step, not another iteration."
                    .to_string(),
            )
        } else {
            None
        },
        psychology_note: psychology_note(input),
    };

    ReportSections {
        executive_decision_summary,
        context_snapshot,
        decision_failure_breakdown,
        what_to_fix_first,
        actionable_recommendations,
        what_this_will_improve,
        next_diagnostic_step,
    }
}

fn build_recommendations(input: &ComposeInput<'_>) -> ActionableRecommendations {
    let verdict = input.verdict;
    let primary_label = verdict.primary.blocker.label().to_string();
    let cta_wording = match input.features.page_type {
        PageType::LocalService => "book an appointment or call",
        PageType::EcommerceProduct => "add to cart",
        PageType::SaasPricing => "start the trial or request a demo",
        _ => "take the primary action",
    };

    let mut message_level = vec![RecommendationItem {
        text: format!(
            "Rework the headline zone so the first thing a visitor reads answers why they should {}.",
            cta_wording
        ),
        addresses: primary_label.clone(),
    }];
    if let Some(secondary) = &verdict.secondary {
        message_level.push(RecommendationItem {
            text: "Add one sentence of copy that pre-empts the secondary objection before it forms."
                .to_string(),
            addresses: secondary.blocker.label().to_string(),
        });
    }

    let mut structure_level = Vec::new();
    if input.features.has_checkout_or_form && !input.features.has_pricing {
        structure_level.push(RecommendationItem {
            text: "Show the price (or its shape) before the form; a commitment request without a visible cost reads as a trap.".to_string(),
            addresses: primary_label.clone(),
        });
    }
    structure_level.push(RecommendationItem {
        text: format!(
            "Move the strongest proof element adjacent to the point where visitors {}.",
            cta_wording
        ),
        addresses: primary_label.clone(),
    });

    let timing_flow = vec![RecommendationItem {
        text: format!(
            "Match the ask to the {} stage: offer the next-smallest step instead of the full commitment.",
            input.stage.stage.as_str()
        ),
        addresses: primary_label,
    }];

    ActionableRecommendations {
        message_level,
        structure_level,
        timing_flow,
    }
}

fn behavioral_change_text(input: &ComposeInput<'_>) -> String {
    format!(
        "Directionally, expect fewer abandoned visits at the {} stage and more visitors completing the {} goal. The tier is an expectation band, not a commitment.",
        input.stage.stage.as_str(),
        input.goal.as_str()
    )
}

fn next_step_suggestion(input: &ComposeInput<'_>) -> String {
    match input.features.page_type {
        PageType::SaasPricing => {
            "Run a pricing-focused pass next: submit the pricing page HTML so plan structure and commitment terms can be scored separately.".to_string()
        }
        PageType::EcommerceProduct => {
            "Run a product-detail pass next: analyze one product page to score risk reversal at the add-to-cart moment.".to_string()
        }
        _ => {
            "Re-run this analysis after the first fix ships; the memory layer will track whether the blocker weakens.".to_string()
        }
    }
}

fn psychology_note(input: &ComposeInput<'_>) -> String {
    format!(
        "At the {} stage, a {} blocker is processed pre-rationally: visitors feel the friction before they can articulate it. The fix order above follows that sequence.",
        input.stage.stage.as_str(),
        input.verdict.primary.category.as_str()
    )
}

fn build_prompt(sections: &ReportSections, locale: Locale, enterprise_aware: bool) -> String {
    let language = match locale {
        Locale::En => "English",
        Locale::Fa => "Persian (Farsi)",
        Locale::Tr => "Turkish",
    };
    let headings = section_headings(locale)
        .iter()
        .map(|h| format!("## {}", h))
        .collect::<Vec<_>>()
        .join("\n");

    let enterprise_rule = if enterprise_aware {
        "\n- Never say the brand lacks trust signals or is untrustworthy; frame trust friction as first-time-buyer clarity."
    } else {
        ""
    };

    format!(
        "Rewrite the structured findings below into professional diagnostic prose in {language}.\n\
        Use exactly these seven section headings, in this order:\n{headings}\n\
        Rules:\n\
        - Measured, clinical tone; no marketing superlatives.\n\
        - No absolute ROI promises; expected lift is directional only.{enterprise_rule}\n\
        - Do not invent findings that are not in the JSON.\n\n\
        FINDINGS JSON:\n{json}",
        language = language,
        headings = headings,
        enterprise_rule = enterprise_rule,
        json = serde_json::to_string_pretty(sections).unwrap_or_default()
    )
}

/// Deterministic template fallback; always lint-clean by construction.
fn fallback_prose(sections: &ReportSections, locale: Locale) -> String {
    let headings = section_headings(locale);
    let mut out = String::new();

    out.push_str(&format!("## {}\n", headings[0]));
    out.push_str(&format!(
        "Primary blocker: {} ({} category), confidence {}/100.{}\n\n",
        sections.executive_decision_summary.primary_blocker,
        sections.executive_decision_summary.category,
        sections.executive_decision_summary.confidence,
        if sections.executive_decision_summary.findings_limited {
            " Findings are limited: the artifact carried little usable signal."
        } else {
            ""
        }
    ));

    out.push_str(&format!("## {}\n", headings[1]));
    let ctx = &sections.context_snapshot;
    out.push_str(&format!(
        "Business type: {} (confidence {:.2}). Page intent: {}. Decision stage: {} (confidence {:.2}). Brand maturity: {} (confidence {:.2}).\n\n",
        ctx.business_type,
        ctx.business_type_confidence,
        ctx.page_intent,
        ctx.decision_stage,
        ctx.decision_stage_confidence,
        ctx.brand_maturity,
        ctx.brand_maturity_confidence
    ));

    out.push_str(&format!("## {}\n", headings[2]));
    out.push_str(&sections.decision_failure_breakdown.primary);
    out.push('\n');
    if let Some(secondary) = &sections.decision_failure_breakdown.secondary {
        out.push_str(secondary);
        out.push('\n');
    }
    if let Some(interaction) = &sections.decision_failure_breakdown.interaction {
        out.push_str(interaction);
        out.push('\n');
    }
    out.push('\n');

    out.push_str(&format!("## {}\n", headings[3]));
    let fix = &sections.what_to_fix_first;
    out.push_str(&format!(
        "{}\nWhy this first: {}\nCost of inaction: {}\n\n",
        fix.intervention, fix.rationale, fix.cost_of_inaction
    ));

    out.push_str(&format!("## {}\n", headings[4]));
    for (group, items) in [
        ("Message", &sections.actionable_recommendations.message_level),
        ("Structure", &sections.actionable_recommendations.structure_level),
        ("Timing and flow", &sections.actionable_recommendations.timing_flow),
    ] {
        for item in items {
            out.push_str(&format!("- [{}] {} (addresses: {})\n", group, item.text, item.addresses));
        }
    }
    out.push('\n');

    out.push_str(&format!("## {}\n", headings[5]));
    out.push_str(&format!(
        "Expected lift: {}. {}\n\n",
        sections.what_this_will_improve.expected_lift_label,
        sections.what_this_will_improve.behavioral_change
    ));

    out.push_str(&format!("## {}\n", headings[6]));
    if let Some(redesign) = &sections.next_diagnostic_step.redesign_call {
        out.push_str(redesign);
        out.push('\n');
    } else if let Some(suggestion) = &sections.next_diagnostic_step.suggestion {
        out.push_str(suggestion);
        out.push('\n');
    }
    out.push_str(&sections.next_diagnostic_step.psychology_note);
    out.push('\n');

    out
}
