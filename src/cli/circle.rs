//! Circle command implementation

use anyhow::Result;
use clap::Subcommand;

use curio::store::CircleRole;

use super::{AppContext, print_json};

#[derive(Subcommand)]
pub enum CircleCommand {
    /// Create a circle owned by an account
    Create {
        owner: String,
        name: String,

        /// Maximum members (defaults to circles.default_member_cap)
        #[arg(long)]
        cap: Option<u32>,
    },

    /// Join a circle by invite code
    Join { account: String, code: String },

    /// Leave a circle
    Leave { account: String, circle: String },

    /// Delete a circle (owner only)
    Delete { owner: String, circle: String },

    /// Change a member's role to admin or member (owner only)
    Role {
        owner: String,
        circle: String,
        account: String,
        role: String,
    },

    /// List a circle's members
    Members { circle: String },

    /// List the circles an account belongs to
    List { account: String },
}

pub async fn circle_command(ctx: &AppContext, command: CircleCommand) -> Result<()> {
    let circles = ctx.store.circles();
    match command {
        CircleCommand::Create { owner, name, cap } => {
            let circle = circles.create(&owner, &name, cap)?;
            if ctx.json {
                return print_json(&circle);
            }
            println!("Created circle {} ({})", circle.name, circle.circle_id);
            println!("Invite code: {}", circle.invite_code);
        }
        CircleCommand::Join { account, code } => {
            let member = circles.join(&account, &code)?;
            if ctx.json {
                return print_json(&member);
            }
            let circle = circles.get(&member.circle_id)?;
            println!("{} is a {} of {}", account, member.role.as_str(), circle.name);
        }
        CircleCommand::Leave { account, circle } => {
            circles.leave(&account, &circle)?;
            println!("{} left {}", account, circle);
        }
        CircleCommand::Delete { owner, circle } => {
            circles.delete(&owner, &circle)?;
            println!("Deleted circle {}", circle);
        }
        CircleCommand::Role {
            owner,
            circle,
            account,
            role,
        } => {
            let role = CircleRole::parse(&role)?;
            circles.set_role(&owner, &circle, &account, role)?;
            println!("{} is now a {} of {}", account, role.as_str(), circle);
        }
        CircleCommand::Members { circle } => {
            let members = circles.members(&circle)?;
            if ctx.json {
                return print_json(&members);
            }
            let info = circles.get(&circle)?;
            println!("{} ({}/{}):\n", info.name, members.len(), info.member_cap);
            for m in members {
                println!("  {:<24} {}", m.account_id, m.role.as_str());
            }
        }
        CircleCommand::List { account } => {
            let list = circles.circles_for(&account)?;
            if ctx.json {
                return print_json(&list);
            }
            if list.is_empty() {
                println!("{} is not in any circle.", account);
            }
            for c in list {
                println!("  {}  {:<30} code {}", c.circle_id, c.name, c.invite_code);
            }
        }
    }
    Ok(())
}
