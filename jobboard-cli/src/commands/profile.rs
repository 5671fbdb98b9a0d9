use anyhow::Result;
use clap::Subcommand;
use shared::{
    config::ClientConfig,
    models::{EmployerProfile, ItianProfile, UserRole},
};

use super::{authenticated_client, failed, or_dash};

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show the profile matching the saved session's role
    Show,
    /// Show the company profile
    Employer,
    /// Show the graduate profile
    Itian,
}

pub async fn run(command: ProfileCommand, config: &ClientConfig) -> Result<()> {
    let (client, session) = authenticated_client(config)?;
    let command = match command {
        ProfileCommand::Show if session.role == Some(UserRole::Employer) => ProfileCommand::Employer,
        ProfileCommand::Show => ProfileCommand::Itian,
        other => other,
    };

    let rendered = match command {
        ProfileCommand::Employer => client
            .employer_profile()
            .await
            .map_err(failed("loading the company profile"))?
            .map(|profile| render_employer(&profile)),
        ProfileCommand::Itian | ProfileCommand::Show => client
            .itian_profile()
            .await
            .map_err(failed("loading the profile"))?
            .map(|profile| render_itian(&profile)),
    };
    println!(
        "{}",
        rendered.unwrap_or_else(|| "No profile has been created yet.".to_string())
    );
    Ok(())
}

fn render_employer(profile: &EmployerProfile) -> String {
    format!(
        "{}\nwebsite:  {}\nlocation: {}\n\n{}",
        profile.company_name,
        or_dash(profile.website.as_deref()),
        or_dash(profile.location.as_deref()),
        or_dash(profile.company_description.as_deref())
    )
}

fn render_itian(profile: &ItianProfile) -> String {
    let graduated = profile.graduation_year.map(|year| year.to_string());
    let skills = profile.skills.join(", ");
    format!(
        "{}\ntrack:     {}\ngraduated: {}\nskills:    {}\n\n{}",
        profile.full_name(),
        or_dash(profile.track.as_deref()),
        or_dash(graduated.as_deref()),
        or_dash(Some(skills.as_str())),
        or_dash(profile.bio.as_deref())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::UserId;

    #[test]
    fn itian_profile_lists_skills() {
        let profile = ItianProfile {
            user_id: UserId(5),
            first_name: "Sara".into(),
            last_name: "Adel".into(),
            bio: None,
            track: Some("Open Source".into()),
            graduation_year: Some(2024),
            skills: vec!["rust".into(), "sql".into()],
        };
        let rendered = render_itian(&profile);
        assert!(rendered.starts_with("Sara Adel\n"));
        assert!(rendered.contains("skills:    rust, sql"));
        assert!(rendered.ends_with("\n\n-"));
    }

    #[test]
    fn employer_profile_marks_missing_website() {
        let profile = EmployerProfile {
            user_id: UserId(2),
            company_name: "Acme".into(),
            company_description: Some("Widgets".into()),
            website: None,
            location: Some("Cairo".into()),
        };
        let rendered = render_employer(&profile);
        assert!(rendered.contains("website:  -"));
        assert!(rendered.contains("location: Cairo"));
    }
}
