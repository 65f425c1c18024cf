// Resume feedback prompt templates.

pub const FEEDBACK_SYSTEM: &str =
    "You are an expert in ATS (Applicant Tracking System) and resume analysis.";

/// Shape the model must return. `overallScore` and `ATS` are read by the service;
/// the other sections are passed through to the client.
pub const AI_RESPONSE_FORMAT: &str = r#"interface Feedback {
  overallScore: number; // max 100
  ATS: {
    score: number; // rate based on ATS suitability
    tips: {
      type: "good" | "improve";
      tip: string; // give 3-4 tips
    }[];
  };
  toneAndStyle: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string; // make it a short "title" for the actual explanation
      explanation: string; // explain in detail here
    }[]; // give 3-4 tips
  };
  content: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[];
  };
  structure: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[];
  };
  skills: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[];
  };
}"#;

/// Job-specific instruction payload sent alongside the resume.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        "Please analyze and rate this resume and suggest how to improve it.
The rating can be low if the resume is bad.
Be thorough and detailed. Don't be afraid to point out any mistakes or areas for improvement.
If there is a lot to improve, don't hesitate to give low scores. This is to help the user to improve their resume.
If available, use the job description for the job user is applying to to give more detailed feedback.
If provided, take the job description into consideration.
The job title is: {job_title}
The job description is: {job_description}
Provide the feedback using the following format:
{AI_RESPONSE_FORMAT}
Return the analysis as a JSON object, without any other text and without the backticks.
Do not include any other text or comments."
    )
}
