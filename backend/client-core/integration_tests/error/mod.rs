mod lockfile;
mod prefs;
mod supervisor;
